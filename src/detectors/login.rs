//! Login-form inspection and brand impersonation.
//!
//! Password-accepting forms are scored by where their credentials go:
//! raw IP targets, plain-http submission, cross-domain submission, and
//! non-http(s) schemes each add a flag. Brand impersonation counts brand
//! keyword occurrences in the page title and text and weights them by
//! brand priority, skipping pages served from the brand's own domains.

use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::core::{Flag, PageData};
use crate::reputation::ReputationData;

const IP_SUBMIT_SCORE: u32 = 30;
const INSECURE_SUBMIT_SCORE: u32 = 25;
const CROSS_DOMAIN_SUBMIT_SCORE: u32 = 15;
const SUSPICIOUS_SCHEME_SCORE: u32 = 40;

const BRAND_SCORE_CAP: u32 = 40;
const MIN_KEYWORD_OCCURRENCES: usize = 2;
const LOGO_HINT_SCORE: u32 = 10;

/// One password form and what was suspicious about its target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormFinding {
    pub action: String,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginFormReport {
    pub password_forms: usize,
    pub findings: Vec<FormFinding>,
    pub score: u32,
    pub flags: Vec<Flag>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BrandReport {
    pub detected: bool,
    pub brand: Option<String>,
    pub occurrences: usize,
    pub score: u32,
    pub flags: Vec<Flag>,
}

/// Inspect every password-accepting form on the page.
pub fn check_forms(page: &PageData, page_url: &Url) -> LoginFormReport {
    let mut report = LoginFormReport::default();

    for form in page.forms.iter().filter(|f| f.has_password_field()) {
        report.password_forms += 1;

        let target = match resolve_action(&form.action, page_url) {
            Some(t) => t,
            None => continue,
        };
        let mut issues = Vec::new();

        match target.scheme() {
            "https" => {}
            "http" => {
                issues.push("insecure_submit".to_string());
                report.score += INSECURE_SUBMIT_SCORE;
                report.flags.push(Flag::new(
                    "insecure_submit",
                    format!("password form submits over http to {}", target),
                    INSECURE_SUBMIT_SCORE,
                ));
            }
            other => {
                issues.push("suspicious_scheme".to_string());
                report.score += SUSPICIOUS_SCHEME_SCORE;
                report.flags.push(Flag::new(
                    "suspicious_scheme",
                    format!("password form submits via {other}: scheme"),
                    SUSPICIOUS_SCHEME_SCORE,
                ));
            }
        }

        match target.host() {
            Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {
                issues.push("ip_submit".to_string());
                report.score += IP_SUBMIT_SCORE;
                report.flags.push(Flag::new(
                    "ip_submit",
                    format!("password form submits to raw IP {}", target),
                    IP_SUBMIT_SCORE,
                ));
            }
            Some(Host::Domain(host)) => {
                if !same_site(host, page_url) {
                    issues.push("cross_domain_submit".to_string());
                    report.score += CROSS_DOMAIN_SUBMIT_SCORE;
                    report.flags.push(Flag::new(
                        "cross_domain_submit",
                        format!("password form submits off-site to {host}"),
                        CROSS_DOMAIN_SUBMIT_SCORE,
                    ));
                }
            }
            None => {}
        }

        if !issues.is_empty() {
            report.findings.push(FormFinding {
                action: target.to_string(),
                issues,
            });
        }
    }

    report
}

/// Brand impersonation over page title and text. Pages on a brand's own
/// domains are exempt, as are pages on the builtin trusted list.
pub fn check_brand(page: &PageData, host: &str, data: &ReputationData) -> BrandReport {
    if data.is_trusted_domain(host) {
        return BrandReport::default();
    }

    let haystack = format!("{} {}", page.title, page.text_content).to_ascii_lowercase();
    let mut best: Option<(&crate::reputation::Brand, usize)> = None;

    for brand in &data.brands {
        if brand.is_legitimate_domain(host) {
            continue;
        }
        let occurrences: usize = brand
            .keywords
            .iter()
            .map(|kw| haystack.matches(kw.as_str()).count())
            .sum();
        if occurrences < MIN_KEYWORD_OCCURRENCES {
            continue;
        }
        if best.map_or(true, |(_, n)| occurrences > n) {
            best = Some((brand, occurrences));
        }
    }

    let (brand, occurrences) = match best {
        Some(hit) => hit,
        None => return BrandReport::default(),
    };

    let mut score = (occurrences as u32 * brand.priority_weight()).min(BRAND_SCORE_CAP);
    let mut flags = vec![Flag::new(
        "brand_impersonation",
        format!(
            "{} mentions of '{}' on a page {} does not belong to",
            occurrences, brand.name, host
        ),
        score,
    )];

    if let Some(src) = logo_hint(page, brand) {
        score += LOGO_HINT_SCORE;
        flags.push(Flag::new(
            "brand_logo",
            format!("image resembling a {} logo from {}", brand.name, src),
            LOGO_HINT_SCORE,
        ));
    }

    BrandReport {
        detected: true,
        brand: Some(brand.name.clone()),
        occurrences,
        score,
        flags,
    }
}

/// Resolve a form action against the page URL. Empty actions submit back
/// to the page itself.
fn resolve_action(action: &str, page_url: &Url) -> Option<Url> {
    if action.trim().is_empty() {
        return Some(page_url.clone());
    }
    Url::parse(action)
        .or_else(|_| page_url.join(action))
        .ok()
}

fn same_site(target_host: &str, page_url: &Url) -> bool {
    let page_host = match page_url.host_str() {
        Some(h) => h,
        None => return false,
    };
    let root = |h: &str| psl::domain_str(h).map(str::to_string);
    match (root(target_host), root(page_host)) {
        (Some(a), Some(b)) => a == b,
        _ => target_host.eq_ignore_ascii_case(page_host),
    }
}

/// A brand keyword in an image src or alt, where the image is not served
/// from the brand's own domains.
fn logo_hint<'a>(page: &'a PageData, brand: &crate::reputation::Brand) -> Option<&'a str> {
    page.images.iter().find_map(|img| {
        let src_lower = img.src.to_ascii_lowercase();
        let alt_lower = img.alt.to_ascii_lowercase();
        let mentions_brand = brand
            .keywords
            .iter()
            .any(|kw| src_lower.contains(kw.as_str()) || alt_lower.contains(kw.as_str()));
        if !mentions_brand {
            return None;
        }
        let from_brand = Url::parse(&img.src)
            .ok()
            .and_then(|u| u.host_str().map(|h| brand.is_legitimate_domain(h)))
            .unwrap_or(false);
        (!from_brand).then_some(img.src.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FormData, ImageData, InputField};

    fn password_form(action: &str) -> FormData {
        FormData {
            action: action.to_string(),
            method: "post".to_string(),
            inputs: vec![
                InputField {
                    kind: "text".to_string(),
                    name: "user".to_string(),
                },
                InputField {
                    kind: "password".to_string(),
                    name: "pass".to_string(),
                },
            ],
        }
    }

    fn page_with_forms(url: &str, forms: Vec<FormData>) -> (PageData, Url) {
        let page = PageData {
            url: url.to_string(),
            forms,
            ..PageData::default()
        };
        let parsed = Url::parse(url).unwrap();
        (page, parsed)
    }

    #[test]
    fn credentials_to_raw_ip_over_http() {
        let (page, url) = page_with_forms(
            "https://login.example.com/",
            vec![password_form("http://203.0.113.5/collect")],
        );
        let report = check_forms(&page, &url);
        assert_eq!(report.password_forms, 1);
        let issues = &report.findings[0].issues;
        assert!(issues.contains(&"ip_submit".to_string()));
        assert!(issues.contains(&"insecure_submit".to_string()));
        assert!(report.score >= 55);
    }

    #[test]
    fn cross_domain_submission() {
        let (page, url) = page_with_forms(
            "https://shop.example.com/",
            vec![password_form("https://harvest.evil.net/login")],
        );
        let report = check_forms(&page, &url);
        assert_eq!(report.score, CROSS_DOMAIN_SUBMIT_SCORE);
        assert_eq!(report.flags[0].kind, "cross_domain_submit");
    }

    #[test]
    fn same_site_https_form_is_clean() {
        let (page, url) = page_with_forms(
            "https://example.com/login",
            vec![password_form("https://auth.example.com/session")],
        );
        let report = check_forms(&page, &url);
        assert_eq!(report.score, 0);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn relative_action_resolves_against_page() {
        let (page, url) = page_with_forms(
            "https://example.com/account/login",
            vec![password_form("/session")],
        );
        let report = check_forms(&page, &url);
        assert_eq!(report.score, 0);
    }

    #[test]
    fn empty_action_submits_to_page() {
        let (page, url) =
            page_with_forms("http://example.com/login", vec![password_form("")]);
        let report = check_forms(&page, &url);
        assert_eq!(report.score, INSECURE_SUBMIT_SCORE);
    }

    #[test]
    fn non_http_scheme_is_flagged() {
        let (page, url) = page_with_forms(
            "https://example.com/",
            vec![password_form("javascript:void(0)")],
        );
        let report = check_forms(&page, &url);
        assert_eq!(report.score, SUSPICIOUS_SCHEME_SCORE);
        assert_eq!(report.flags[0].kind, "suspicious_scheme");
    }

    #[test]
    fn forms_without_passwords_are_ignored() {
        let search = FormData {
            action: "http://203.0.113.5/q".to_string(),
            method: "get".to_string(),
            inputs: vec![InputField {
                kind: "text".to_string(),
                name: "q".to_string(),
            }],
        };
        let (page, url) = page_with_forms("https://example.com/", vec![search]);
        let report = check_forms(&page, &url);
        assert_eq!(report.password_forms, 0);
        assert_eq!(report.score, 0);
    }

    fn brand_page(title: &str, text: &str) -> PageData {
        PageData {
            url: "https://paypa1-login.example/".to_string(),
            title: title.to_string(),
            text_content: text.to_string(),
            ..PageData::default()
        }
    }

    #[test]
    fn repeated_brand_mentions_on_foreign_host() {
        let data = ReputationData::builtin().unwrap();
        let page = brand_page(
            "PayPal account verification",
            "Log in to PayPal to restore your PayPal account",
        );
        let report = check_brand(&page, "paypa1-login.example", &data);
        assert!(report.detected);
        assert_eq!(report.brand.as_deref(), Some("paypal"));
        assert_eq!(report.occurrences, 3);
        // Priority 1 brand: weight 30, capped at 40.
        assert_eq!(report.score, BRAND_SCORE_CAP);
    }

    #[test]
    fn single_mention_is_not_impersonation() {
        let data = ReputationData::builtin().unwrap();
        let page = brand_page("News", "PayPal announced quarterly earnings");
        let report = check_brand(&page, "news.example", &data);
        assert!(!report.detected);
    }

    #[test]
    fn brand_on_its_own_domain_is_exempt() {
        let data = ReputationData::builtin().unwrap();
        let page = brand_page("PayPal", "PayPal PayPal PayPal");
        let report = check_brand(&page, "www.paypal.com", &data);
        assert!(!report.detected);
    }

    #[test]
    fn trusted_host_short_circuits() {
        let data = ReputationData::builtin().unwrap();
        let page = brand_page("PayPal", "PayPal checkout with PayPal");
        let report = check_brand(&page, "accounts.google.com", &data);
        assert!(!report.detected);
    }

    #[test]
    fn foreign_logo_adds_to_the_score() {
        let data = ReputationData::builtin().unwrap();
        let mut page = brand_page("netflix", "renew your netflix plan today");
        page.images.push(ImageData {
            src: "https://cdn.evil.example/netflix-logo.png".to_string(),
            alt: "Netflix".to_string(),
        });
        let report = check_brand(&page, "renew-plan.example", &data);
        assert!(report.detected);
        assert!(report.flags.iter().any(|f| f.kind == "brand_logo"));
        // Priority 2 brand: 2 * 20 = 40 (cap) + 10 logo hint.
        assert_eq!(report.score, 50);
    }
}
