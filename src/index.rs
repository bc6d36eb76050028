use std::fmt::Write;

use ansi_to_html::Esc;
use chrono::SecondsFormat;
use urlencoding::encode;

use crate::render::{HTML_BEGIN, HTML_END};
use crate::storage::PasteEntry;

/// Render the operator's listing of every stored paste.
pub fn build_index_html(base_url: &str, entries: &[PasteEntry]) -> String {
    let mut rows = String::new();
    for entry in entries {
        // writing into a String cannot fail
        _ = write!(
            rows,
            "<tr>\n<td><a href=\"{base_url}{href}\">{name}</a></td>\n<td>{modified}</td>\n<td>{size}</td>\n</tr>\n",
            href = encode(&entry.name),
            name = Esc(entry.name.as_str()),
            modified = entry.modified.to_rfc3339_opts(SecondsFormat::Secs, true),
            size = entry.size,
        );
    }

    format!(
        "{HTML_BEGIN}
<table>
\t<thead>
\t\t<tr>
\t\t\t<th>name</th><th>modified</th><th>size</th>
\t\t</tr>
\t</thead>
\t<tbody>
{rows}\t</tbody>
</table>
{HTML_END}"
    )
}
