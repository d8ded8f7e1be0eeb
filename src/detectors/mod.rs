//! The detector suite.
//!
//! Every detector is a pure function over its input and the reference
//! data (plus `&Settings` where category toggles apply), returning a
//! typed report with a non-negative score and the flags it raised.
//! Detectors are order-independent; the coordinator fixes
//! the invocation sequence only so the aggregate flag list has a stable
//! order. A detector given an unparsable or empty input returns its
//! zero/neutral report rather than erroring.

pub mod content;
pub mod homograph;
pub mod login;
pub mod malicious;
pub mod patterns;
pub mod shortener;
pub mod tld;
pub mod tracker;
pub mod typosquat;
pub mod urgency;

use serde::{Deserialize, Serialize};

use crate::core::{Flag, PageData};

const POPUP_LOGIN_SCORE: u32 = 10;
const IFRAME_LOGIN_SCORE: u32 = 10;
const RIGHT_CLICK_DISABLED_SCORE: u32 = 5;

/// Page-characteristic signals reported by the content collector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageSignalReport {
    pub popup_login: bool,
    pub iframe_login: bool,
    pub right_click_disabled: bool,
    pub score: u32,
    pub flags: Vec<Flag>,
}

/// Scores the boolean page-level signals: login prompts in popups or
/// iframes and disabled right-click (a common cloaking trick).
pub fn page_characteristics(page: &PageData) -> PageSignalReport {
    let mut report = PageSignalReport {
        popup_login: page.has_popup_login,
        iframe_login: page.has_iframe_login,
        right_click_disabled: page.right_click_disabled,
        ..Default::default()
    };

    if page.has_popup_login {
        report.flags.push(Flag::new(
            "popup_login",
            "login prompt displayed in a popup",
            POPUP_LOGIN_SCORE,
        ));
        report.score += POPUP_LOGIN_SCORE;
    }
    if page.has_iframe_login {
        report.flags.push(Flag::new(
            "iframe_login",
            "login form embedded in an iframe",
            IFRAME_LOGIN_SCORE,
        ));
        report.score += IFRAME_LOGIN_SCORE;
    }
    if page.right_click_disabled {
        report.flags.push(Flag::new(
            "right_click_disabled",
            "page disables the context menu",
            RIGHT_CLICK_DISABLED_SCORE,
        ));
        report.score += RIGHT_CLICK_DISABLED_SCORE;
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_page_has_no_signal_flags() {
        let report = page_characteristics(&PageData::default());
        assert_eq!(report.score, 0);
        assert!(report.flags.is_empty());
    }

    #[test]
    fn all_signals_sum() {
        let page = PageData {
            has_popup_login: true,
            has_iframe_login: true,
            right_click_disabled: true,
            ..Default::default()
        };
        let report = page_characteristics(&page);
        assert_eq!(report.score, 25);
        assert_eq!(report.flags.len(), 3);
    }
}
