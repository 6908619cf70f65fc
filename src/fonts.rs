// fonts.rs — egui 中文字体
//
// 房间名、物件名多为中文，egui 默认字体没有 CJK 字形。
// 运行时按顺序查找：系统字体目录 -> <exe_dir>/assets/fonts -> ./assets/fonts。
// ab_glyph 能解析才采用（.ttc 解析失败时跳过）。

use std::path::{Path, PathBuf};

const WINDOWS_FONTS: &[&str] = &["msyh.ttf", "simhei.ttf", "simsun.ttf", "Deng.ttf", "arialuni.ttf"];

const MACOS_FONTS: &[&str] = &[
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/STHeiti Light.ttc",
    "/System/Library/Fonts/Hiragino Sans GB.ttc",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "/Library/Fonts/NotoSansSC-Regular.otf",
];

const LINUX_FONTS: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansSC-Regular.otf",
    "/usr/share/fonts/truetype/noto/NotoSansSC-Regular.ttf",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
];

const BUNDLED_FONTS: &[&str] = &["NotoSansSC-Regular.otf", "NotoSansSC-Regular.ttf", "NotoSansCJK-Regular.ttc"];

fn candidates() -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = if cfg!(windows) {
        let dir = PathBuf::from(r"C:\Windows\Fonts");
        WINDOWS_FONTS.iter().map(|f| dir.join(f)).collect()
    } else if cfg!(target_os = "macos") {
        MACOS_FONTS.iter().map(PathBuf::from).collect()
    } else {
        let mut v: Vec<PathBuf> = LINUX_FONTS.iter().map(PathBuf::from).collect();
        if let Ok(home) = std::env::var("HOME") {
            let home = PathBuf::from(home);
            v.extend(BUNDLED_FONTS.iter().map(|f| home.join(".local/share/fonts").join(f)));
        }
        v
    };

    let bundled_dirs = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|d| d.join("assets").join("fonts")))
        .into_iter()
        .chain(std::iter::once(PathBuf::from("assets").join("fonts")));
    for dir in bundled_dirs {
        out.extend(BUNDLED_FONTS.iter().map(|f| dir.join(f)));
    }
    out
}

fn load_font(path: &Path) -> Option<Vec<u8>> {
    let bytes = std::fs::read(path).ok()?;
    ab_glyph::FontRef::try_from_slice(&bytes).ok()?;
    Some(bytes)
}

/// Register the first usable CJK font as egui's primary font.
pub fn setup_egui_fonts(ctx: &egui::Context) {
    let Some((path, bytes)) = candidates().into_iter().find_map(|p| load_font(&p).map(|b| (p, b))) else {
        log::warn!("{}", panorama_tour::i18n::tr("font.not_found"));
        return;
    };
    log::info!(
        "{}",
        panorama_tour::i18n::tr_with("font.using", &[("path", path.display().to_string())])
    );

    let mut fonts = egui::FontDefinitions::default();
    fonts.font_data.insert("ui".to_owned(), egui::FontData::from_owned(bytes));
    for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
        if let Some(list) = fonts.families.get_mut(&family) {
            list.insert(0, "ui".to_owned());
        }
    }
    ctx.set_fonts(fonts);
}
