//! CLI enum types for gender, action, aspect ratio and language options.

use clap::ValueEnum;

use crate::messages::Language;
use crate::model::{Action, AspectRatio, Gender};

/// Model gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GenderArg {
    Female,
    Male,
}

impl From<GenderArg> for Gender {
    fn from(g: GenderArg) -> Self {
        match g {
            GenderArg::Female => Gender::Female,
            GenderArg::Male => Gender::Male,
        }
    }
}

/// Scene the model performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    /// Runway walk
    Walk,
    /// Sitting in a cafe with coffee
    Coffee,
    /// Stretching in a studio
    Stretch,
}

impl From<ActionArg> for Action {
    fn from(a: ActionArg) -> Self {
        match a {
            ActionArg::Walk => Action::Walk,
            ActionArg::Coffee => Action::Coffee,
            ActionArg::Stretch => Action::Stretch,
        }
    }
}

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AspectArg {
    #[default]
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "16:9")]
    Landscape,
}

impl From<AspectArg> for AspectRatio {
    fn from(a: AspectArg) -> Self {
        match a {
            AspectArg::Portrait => AspectRatio::Portrait,
            AspectArg::Landscape => AspectRatio::Landscape,
        }
    }
}

/// Progress message language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LanguageArg {
    #[value(name = "zh-TW")]
    ZhTw,
    #[value(name = "zh-CN")]
    ZhCn,
    En,
}

impl From<LanguageArg> for Language {
    fn from(l: LanguageArg) -> Self {
        match l {
            LanguageArg::ZhTw => Language::ZhTw,
            LanguageArg::ZhCn => Language::ZhCn,
            LanguageArg::En => Language::En,
        }
    }
}
