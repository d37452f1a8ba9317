//! Localized progress and error copy.
//!
//! The orchestrator reports every transition as a [`Message`]; callers render
//! it in one of the supported languages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported UI languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "zh-TW")]
    ZhTw,
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "en")]
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::ZhTw => "zh-TW",
            Language::ZhCn => "zh-CN",
            Language::En => "en",
        }
    }

    /// Parse a language code, falling back to Traditional Chinese for unknown codes.
    pub fn from_code_or_default(code: &str) -> Self {
        code.parse().unwrap_or_default()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "zh-TW" | "zh-tw" => Ok(Language::ZhTw),
            "zh-CN" | "zh-cn" => Ok(Language::ZhCn),
            "en" | "EN" => Ok(Language::En),
            other => Err(format!(
                "Unknown language '{}'. Available: zh-TW, zh-CN, en",
                other
            )),
        }
    }
}

/// Every user-visible notification the generation flow can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Message {
    Build,
    Init,
    Fusing,
    Generating,
    Rendering,
    Downloading,
    Ready,
    ErrorEmpty,
    ErrorGen,
    ErrorLink,
    ErrorDownload,
    ErrorKey,
    KeyRequired,
    TrialExhausted,
    TimedOut,
    Cancelled,
}

impl Message {
    /// Localized text for this message.
    pub fn text(self, lang: Language) -> &'static str {
        match lang {
            Language::ZhTw => self.zh_tw(),
            Language::ZhCn => self.zh_cn(),
            Language::En => self.en(),
        }
    }

    fn en(self) -> &'static str {
        match self {
            Message::Build => "Building fashion scene...",
            Message::Init => "Initializing Veo model...",
            Message::Fusing => "AI is fusing multiple reference images (may take longer)...",
            Message::Generating => "AI is generating model motion...",
            Message::Rendering => "Rendering lighting and materials...",
            Message::Downloading => "Downloading video...",
            Message::Ready => "Video ready",
            Message::ErrorEmpty => "Please upload at least one reference image",
            Message::ErrorGen => "Video generation failed",
            Message::ErrorLink => "Could not get video download link",
            Message::ErrorDownload => "Video download failed",
            Message::ErrorKey => "API Key invalid or unauthorized. Please re-select.",
            Message::KeyRequired => {
                "API Key Required: select an API key from a Google Cloud project with billing enabled."
            }
            Message::TrialExhausted => {
                "Free Trial Ended: to generate more videos, please configure your own API Key."
            }
            Message::TimedOut => "Video generation timed out",
            Message::Cancelled => "Video generation cancelled",
        }
    }

    fn zh_tw(self) -> &'static str {
        match self {
            Message::Build => "正在構建時尚場景...",
            Message::Init => "初始化 Veo 模型...",
            Message::Fusing => "AI 正在融合多張參考圖 (可能需要較長時間)...",
            Message::Generating => "AI 正在生成模特動態...",
            Message::Rendering => "正在渲染光影與材質...",
            Message::Downloading => "正在下載影片...",
            Message::Ready => "影片已完成",
            Message::ErrorEmpty => "請至少上傳一張參考圖片",
            Message::ErrorGen => "影片生成失敗",
            Message::ErrorLink => "未能獲取影片下載連結",
            Message::ErrorDownload => "影片下載失敗",
            Message::ErrorKey => "API Key 錯誤或未授權。請重新選擇。",
            Message::KeyRequired => "需要選擇 API 密鑰",
            Message::TrialExhausted => "免費試用已結束，請配置您自己的 API Key。",
            Message::TimedOut => "影片生成逾時",
            Message::Cancelled => "影片生成已取消",
        }
    }

    fn zh_cn(self) -> &'static str {
        match self {
            Message::Build => "正在构建时尚场景...",
            Message::Init => "初始化 Veo 模型...",
            Message::Fusing => "AI 正在融合多张参考图 (可能需要较长时间)...",
            Message::Generating => "AI 正在生成模特动态...",
            Message::Rendering => "正在渲染光影与材质...",
            Message::Downloading => "正在下载视频...",
            Message::Ready => "视频已完成",
            Message::ErrorEmpty => "请至少上传一张参考图片",
            Message::ErrorGen => "视频生成失败",
            Message::ErrorLink => "未能获取视频下载链接",
            Message::ErrorDownload => "视频下载失败",
            Message::ErrorKey => "API Key 错误或未授权。请重新选择。",
            Message::KeyRequired => "需要选择 API 密钥",
            Message::TrialExhausted => "免费试用已结束，请配置您自己的 API Key。",
            Message::TimedOut => "视频生成超时",
            Message::Cancelled => "视频生成已取消",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parse() {
        assert_eq!("en".parse::<Language>(), Ok(Language::En));
        assert_eq!("zh-CN".parse::<Language>(), Ok(Language::ZhCn));
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_unknown_language_falls_back_to_traditional_chinese() {
        assert_eq!(Language::from_code_or_default("fr"), Language::ZhTw);
        assert_eq!(Language::default(), Language::ZhTw);
    }

    #[test]
    fn test_message_text_per_language() {
        assert_eq!(Message::Downloading.text(Language::En), "Downloading video...");
        assert_eq!(Message::Downloading.text(Language::ZhCn), "正在下载视频...");
        assert_eq!(Message::Downloading.text(Language::ZhTw), "正在下載影片...");
    }

    #[test]
    fn test_language_serde_uses_codes() {
        let lang: Language = serde_json::from_str("\"zh-CN\"").unwrap();
        assert_eq!(lang, Language::ZhCn);
        assert_eq!(serde_json::to_string(&Language::En).unwrap(), "\"en\"");
    }
}
