use anyhow::Context;
use syntect::highlighting::ThemeSet;
use syntect::html::css_for_theme_with_class_style;

use crate::render::CLASS_STYLE;

pub fn run(theme_name: &str) -> anyhow::Result<()> {
    let css = stylesheet(theme_name)?;
    print!("{css}");
    Ok(())
}

fn stylesheet(theme_name: &str) -> anyhow::Result<String> {
    let themes = ThemeSet::load_defaults();
    let theme = themes.themes.get(theme_name).with_context(|| {
        let known: Vec<_> = themes.themes.keys().map(String::as_str).collect();
        format!("unknown theme {theme_name:?}, expected one of: {}", known.join(", "))
    })?;
    css_for_theme_with_class_style(theme, CLASS_STYLE).context("failed to generate css")
}
