//! Deterministic clean-up of drafted replies.
//!
//! Header extraction is best effort: when a pattern does not match, the
//! documented defaults are used.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use crate::models::EmailCategory;

/// Greeting name used when no sender can be found.
pub const DEFAULT_SENDER_NAME: &str = "there";
pub const DEFAULT_SUBJECT: &str = "Your Inquiry";
pub const DEFAULT_SUBJECT_LINE: &str = "Subject: Re: Your Email";
pub const DEFAULT_DEPARTMENT: &str = "Office Assistant";

const TRACE_MARKERS: [&str; 5] = ["Thought:", "Action:", "Action Input:", "Observation:", "Question:"];
const POLICY_KEYWORDS: [&str; 3] = ["policy", "sick", "leave"];

static FROM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)From:\s*(?:(.*?)\s*<)?([^>\n]+)>?").expect("static regex"));
static TO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)To:\s*(?:(.*?)\s*<)?([^>\n]+)>?").expect("static regex"));
static SUBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Subject:\s*(.+)").expect("static regex"));

/// Closing patterns, tried in order. Only the first that matches is replaced.
static SIGNATURE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?m)Best regards,?\s*\n\s*[\w\s/\[\]]+$",
        r"(?m)Thanks,?\s*\n\s*[\w\s/\[\]]+$",
        r"(?m)Sincerely,?\s*\n\s*[\w\s/\[\]]+$",
        r"(?m)Regards,?\s*\n\s*[\w\s/\[\]]+$",
        r"\[\w+[\s/]*\w+\]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

/// A display name and address parsed from a header line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub name: Option<String>,
    pub email: Option<String>,
}

fn parse_contact(re: &Regex, content: &str) -> Contact {
    let Some(caps) = re.captures(content) else {
        return Contact::default();
    };
    let name = caps.get(1).map(|m| m.as_str().trim()).filter(|n| !n.is_empty()).map(str::to_string);
    let email = caps.get(2).map(|m| m.as_str().trim().to_string());
    Contact { name, email }
}

/// Sender from the `From:` line. Without a display name the name is derived
/// from the address; without a `From:` line it is [`DEFAULT_SENDER_NAME`].
pub fn extract_sender_info(content: &str) -> (String, Option<String>) {
    let contact = parse_contact(&FROM_RE, content);
    let name = match (&contact.name, &contact.email) {
        (Some(name), _) => name.clone(),
        (None, Some(email)) => name_from_address(email),
        (None, None) => DEFAULT_SENDER_NAME.to_string(),
    };
    (name, contact.email)
}

/// Recipient from the `To:` line, if any.
pub fn extract_recipient_info(content: &str) -> Contact {
    parse_contact(&TO_RE, content)
}

/// Subject from the `Subject:` line, or [`DEFAULT_SUBJECT`].
pub fn extract_subject(content: &str) -> String {
    SUBJECT_RE
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| DEFAULT_SUBJECT.to_string())
}

/// `jane.doe@acme.com` → `Jane Doe`. The local part is split on the first of
/// `.`, `_` or `-` that occurs in it.
pub fn name_from_address(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    match ['.', '_', '-'].into_iter().find(|sep| local.contains(*sep)) {
        Some(sep) => local.split(sep).map(capitalize).collect::<Vec<_>>().join(" "),
        None => capitalize(local),
    }
}

/// Upper-case the first character and lower-case the rest.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Drop reasoning-trace lines such as `Thought:` or `Action:`.
pub fn strip_trace_lines(draft: &str) -> String {
    draft
        .split('\n')
        .filter(|line| {
            let line = line.trim_start();
            !TRACE_MARKERS.iter().any(|marker| line.starts_with(marker))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Leave exactly one subject line, at the top.
///
/// The first `Subject:` line wins and moves to the top if something preceded
/// it; later ones are removed. Without any, [`DEFAULT_SUBJECT_LINE`] and a
/// blank line are prepended.
pub fn normalize_subject(draft: &str) -> String {
    let is_subject = |line: &str| line.trim_start().starts_with("Subject:");
    let lines: Vec<&str> = draft.split('\n').collect();

    let Some(first) = lines.iter().position(|l| is_subject(l)) else {
        return format!("{DEFAULT_SUBJECT_LINE}\n\n{draft}");
    };

    let subject = lines[first].trim();
    let rest: Vec<&str> = lines
        .iter()
        .enumerate()
        .filter(|(i, l)| *i != first && !is_subject(l))
        .map(|(_, l)| *l)
        .collect();

    if first == 0 {
        std::iter::once(subject).chain(rest).collect::<Vec<_>>().join("\n")
    } else {
        let body = rest.join("\n");
        format!("{subject}\n\n{}", body.trim_start_matches(['\n', ' ']))
    }
}

/// Coarse keyword classification of the reply.
pub fn classify(draft: &str) -> EmailCategory {
    let lower = draft.to_lowercase();
    if POLICY_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        EmailCategory::PolicyQuery
    } else {
        EmailCategory::GeneralInquiry
    }
}

/// Replace the draft's closing with `Best regards,\n<department>`, or append
/// that signature if no known closing is present.
pub fn ensure_signature(draft: &str, department: &str) -> String {
    let signature = format!("Best regards,\n{department}");

    for re in SIGNATURE_RES.iter() {
        if re.is_match(draft) {
            return re.replacen(draft, 1, NoExpand(&signature)).into_owned();
        }
    }

    let mut out = draft.trim_end().to_string();
    if !out.ends_with('.') {
        out.push('.');
    }
    out.push_str("\n\n");
    out.push_str(&signature);
    out
}

/// Trim the model's department answer and drop one wrapping quote on each side.
pub fn clean_department(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix(['"', '\'']).unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix(['"', '\'']).unwrap_or(trimmed);
    let trimmed = trimmed.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Strip trace lines, then normalise the subject.
pub fn clean_draft(output: &str) -> String {
    normalize_subject(&strip_trace_lines(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_with_display_name() {
        let (name, email) = extract_sender_info("Subject: Hi\nFrom: Jane Doe <jane.doe@acme.com>\n\nBody");
        assert_eq!(name, "Jane Doe");
        assert_eq!(email.as_deref(), Some("jane.doe@acme.com"));
    }

    #[test]
    fn sender_name_derived_from_address() {
        assert_eq!(extract_sender_info("From: jane.doe@acme.com").0, "Jane Doe");
        assert_eq!(extract_sender_info("From: JOHN_SMITH@acme.com").0, "John Smith");
        assert_eq!(extract_sender_info("from: mary-ann@acme.com").0, "Mary Ann");
        assert_eq!(extract_sender_info("From: bob@acme.com").0, "Bob");
        assert_eq!(extract_sender_info("From: <pat.lee@acme.com>").0, "Pat Lee");
    }

    #[test]
    fn missing_sender_defaults() {
        assert_eq!(extract_sender_info("Hello team"), ("there".to_string(), None));
    }

    #[test]
    fn recipient_and_subject() {
        let content = "Subject:  Sick leave question \nFrom: a@b.com\nTo: HR Team <hr@acme.com>\n\nHi";
        assert_eq!(
            extract_recipient_info(content),
            Contact { name: Some("HR Team".into()), email: Some("hr@acme.com".into()) }
        );
        assert_eq!(extract_subject(content), "Sick leave question");
        assert_eq!(extract_subject("no header"), "Your Inquiry");
        assert_eq!(extract_recipient_info("nothing here"), Contact::default());
    }

    #[test]
    fn trace_lines_are_removed() {
        let draft = "Thought: done\nSubject: Re: Leave\n  Action: none\nDear Jane,\nObservation: x\nQuestion: y";
        assert_eq!(strip_trace_lines(draft), "Subject: Re: Leave\nDear Jane,");
    }

    #[test]
    fn missing_subject_gets_default() {
        assert_eq!(normalize_subject("Dear Jane,\nHello"), "Subject: Re: Your Email\n\nDear Jane,\nHello");
    }

    #[test]
    fn duplicate_subjects_collapse_to_first() {
        let draft = "Subject: Re: Leave\n\nDear Jane,\nSubject: Re: Other\nThanks";
        assert_eq!(normalize_subject(draft), "Subject: Re: Leave\n\nDear Jane,\nThanks");
    }

    #[test]
    fn late_subject_moves_to_top() {
        let draft = "Here is the reply:\nSubject: Re: Leave\n\nDear Jane,";
        assert_eq!(normalize_subject(draft), "Subject: Re: Leave\n\nHere is the reply:\n\nDear Jane,");
    }

    #[test]
    fn classification_keywords() {
        assert_eq!(classify("Our Sick Leave rules"), EmailCategory::PolicyQuery);
        assert_eq!(classify("Per company POLICY"), EmailCategory::PolicyQuery);
        assert_eq!(classify("Lunch is at noon"), EmailCategory::GeneralInquiry);
    }

    #[test]
    fn placeholder_signature_is_replaced() {
        let draft = "Subject: Re: Leave\n\nDear Jane,\nYou have 10 days.\n\nBest regards,\n[Name/Title]";
        assert_eq!(
            ensure_signature(draft, "HR Department"),
            "Subject: Re: Leave\n\nDear Jane,\nYou have 10 days.\n\nBest regards,\nHR Department"
        );
    }

    #[test]
    fn other_closings_are_replaced() {
        assert_eq!(ensure_signature("Hi.\n\nThanks,\nBob Smith", "IT Support"), "Hi.\n\nBest regards,\nIT Support");
        assert_eq!(ensure_signature("Hi.\n\nSincerely\nThe Team", "HR"), "Hi.\n\nBest regards,\nHR");
        assert_eq!(
            ensure_signature("Please sign here: [Your Name]", "HR"),
            "Please sign here: Best regards,\nHR"
        );
    }

    #[test]
    fn missing_signature_is_appended() {
        assert_eq!(ensure_signature("Thanks for asking  \n", "HR"), "Thanks for asking.\n\nBest regards,\nHR");
        assert_eq!(ensure_signature("All done.", "HR"), "All done.\n\nBest regards,\nHR");
    }

    #[test]
    fn department_is_inserted_literally() {
        assert_eq!(ensure_signature("x\n\nRegards,\nBob", "$1 Team"), "x\n\nBest regards,\n$1 Team");
    }

    #[test]
    fn department_quotes_are_stripped() {
        assert_eq!(clean_department("  \"HR Department\"\n"), Some("HR Department".into()));
        assert_eq!(clean_department("'IT Support'"), Some("IT Support".into()));
        assert_eq!(clean_department("  "), None);
        assert_eq!(clean_department("\"\""), None);
    }
}
