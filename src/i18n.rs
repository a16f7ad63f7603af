/// Simple localization support for the progress-fetch CLI.
/// Locale can be selected via the `--locale` CLI flag (e.g. `--locale zh`).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl Locale {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "zh" | "zh-cn" | "zh_cn" | "zh-hans" | "zh-tw" | "zh_tw" => Self::Zh,
            _ => Self::En,
        }
    }
}

pub struct Messages {
    pub started: &'static str,
    pub finished: &'static str,
    pub aborted: &'static str,
    pub failed: &'static str,
    pub abort_hint: &'static str,
    pub saved_to: &'static str,
    pub total_unknown: &'static str,
    pub form_empty: &'static str,
}

pub static EN: Messages = Messages {
    started: "Download started",
    finished: "Download finished",
    aborted: "Download was aborted",
    failed: "Download failed",
    abort_hint: "press Ctrl-C to abort",
    saved_to: "saved to",
    total_unknown: "?",
    form_empty: "(empty form)",
};

pub static ZH: Messages = Messages {
    started: "下载已开始",
    finished: "下载已完成",
    aborted: "下载已中止",
    failed: "下载失败",
    abort_hint: "按 Ctrl-C 中止",
    saved_to: "已保存到",
    total_unknown: "?",
    form_empty: "（空表单）",
};

pub fn get_messages(locale: Locale) -> &'static Messages {
    match locale {
        Locale::En => &EN,
        Locale::Zh => &ZH,
    }
}
