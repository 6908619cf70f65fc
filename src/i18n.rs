// i18n.rs
//
// Runtime string tables for UI text and tooltips:
// - assets/i18n/<lang>.json next to the executable or in the working dir
// - otherwise the tables compiled into the binary (zh-Hans, en)
// - lookup falls back to zh-Hans, then to the key itself
// - tr("key") / tr_with("key", &[("name", ...)]) with {name} placeholders
//
// Language: --lang <code>, else PANORAMA_LANG, else zh-Hans.

use once_cell::sync::OnceCell;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

pub const FALLBACK_LANG: &str = "zh-Hans";

const EMBEDDED: &[(&str, &str)] = &[
    ("zh-Hans", include_str!("../assets/i18n/zh-Hans.json")),
    ("en", include_str!("../assets/i18n/en.json")),
];

#[derive(Debug, Clone, Default)]
struct Tables {
    lang: String,
    map: HashMap<String, String>,
    fallback_map: HashMap<String, String>,
}

static I18N: OnceCell<RwLock<Tables>> = OnceCell::new();

fn load_json_map(path: &Path) -> Option<HashMap<String, String>> {
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

/// <exe_dir>/assets/i18n/<lang>.json, then ./assets/i18n/<lang>.json
fn find_lang_file(lang: &str) -> Option<PathBuf> {
    let rel = Path::new("assets").join("i18n").join(format!("{}.json", lang));

    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&rel)));

    beside_exe.into_iter().chain(std::iter::once(rel)).find(|p| p.exists())
}

fn load_lang(lang: &str) -> HashMap<String, String> {
    if let Some(m) = find_lang_file(lang).and_then(|p| load_json_map(&p)) {
        return m;
    }

    EMBEDDED
        .iter()
        .find(|(code, _)| *code == lang)
        .and_then(|(_, text)| serde_json::from_str(text).ok())
        .unwrap_or_default()
}

fn build(lang: String) -> Tables {
    let map = load_lang(&lang);
    let fallback_map = if lang == FALLBACK_LANG {
        map.clone()
    } else {
        load_lang(FALLBACK_LANG)
    };
    Tables {
        lang,
        map,
        fallback_map,
    }
}

/// Switch the active language. Safe to call repeatedly.
pub fn init(lang: impl Into<String>) {
    let tables = build(lang.into());
    if let Ok(mut w) = I18N.get_or_init(Default::default).write() {
        *w = tables;
    }
}

fn tables() -> Option<std::sync::RwLockReadGuard<'static, Tables>> {
    I18N.get_or_init(|| RwLock::new(build(FALLBACK_LANG.to_string())))
        .read()
        .ok()
}

pub fn current_lang() -> String {
    tables().map(|t| t.lang.clone()).unwrap_or_else(|| FALLBACK_LANG.to_string())
}

/// Localized text for `key`; the key itself when no table has it.
pub fn tr(key: &str) -> String {
    let Some(t) = tables() else {
        return key.to_string();
    };
    t.map
        .get(key)
        .or_else(|| t.fallback_map.get(key))
        .cloned()
        .unwrap_or_else(|| key.to_string())
}

/// Localized text with `{name}` placeholders substituted. Unknown placeholders stay as-is.
pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    let mut s = tr(key);
    for (k, v) in args {
        s = s.replace(&format!("{{{}}}", k), v);
    }
    s
}

/// Value following `--<name>` on the command line.
pub fn arg_value(name: &str) -> Option<String> {
    let flag = format!("--{}", name);
    let mut it = std::env::args();
    while let Some(a) = it.next() {
        if a == flag {
            return it.next();
        }
    }
    None
}

fn env_value(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Language from CLI/env.
pub fn resolve_lang_from_args() -> String {
    arg_value("lang")
        .or_else(|| env_value("PANORAMA_LANG"))
        .unwrap_or_else(|| FALLBACK_LANG.to_string())
}

/// Tour file from CLI/env, if any.
pub fn resolve_tour_from_args() -> Option<PathBuf> {
    arg_value("config").or_else(|| env_value("PANORAMA_TOUR")).map(PathBuf::from)
}
