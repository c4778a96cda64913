// SPDX-License-Identifier: MIT

//! Intent classifier - maps prompt text to catalog keys
//!
//! Classification is a pure function of the prompt over two ordered rule
//! tables whose phrase sets are compiled into Aho-Corasick automatons once per
//! process:
//!
//! 1. Trigger rules are tried in order; the first rule whose phrase sets all
//!    match wins. No match falls back to the manual trigger.
//! 2. Action rules are all evaluated. Every rule with a match contributes its
//!    key, ordered by where in the prompt the rule first matched.
//!
//! Matching is ASCII case-insensitive and works on raw substrings, so
//! "emails" matches "email".

use aho_corasick::{AhoCorasick, MatchKind};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::ops::Range;

use crate::forge::catalog::{catalog, NodeCategory};

/// Trigger used when no trigger rule matches
pub const DEFAULT_TRIGGER: &str = "manual";

/// Action added when a prompt names no actionable service
pub const DEFAULT_FILLER: &str = "http";

/// Upper bound on action nodes in a rule-engine graph
pub const MAX_ACTIONS: usize = 8;

type TriggerSpec = (&'static str, &'static [&'static [&'static str]]);
type ActionSpec = (&'static str, &'static [&'static str]);

/// Ordered trigger rules: `(key, all_of)`. Every phrase set must match.
///
/// Service-plus-event conjunctions come before the schedule words, and the
/// schedule words come before single-phrase event triggers, so "every day"
/// outranks "form submission" but not "new row added to Google Sheets".
const TRIGGER_RULES: &[TriggerSpec] = &[
    ("webhook", &[&[
        "webhook", "receive data", "receives data", "incoming request", "incoming data",
        "api call", "post request",
    ]]),
    ("sheets_trigger", &[
        &["google sheet", "spreadsheet", "sheets"],
        &[
            "new row", "row is added", "row added", "rows added", "row is updated",
            "sheet changes", "monitor google sheet", "watch google sheet", "monitor the sheet",
        ],
    ]),
    ("github_trigger", &[
        &["github"],
        &[
            "issue is created", "issue created", "new issue", "pull request", "push to",
            "new commit", "new release", "is opened",
        ],
    ]),
    ("stripe_trigger", &[
        &["stripe"],
        &[
            "payment succeeds", "payment succeeded", "payment received", "new payment",
            "successful payment", "payment is made", "new charge", "new subscription",
        ],
    ]),
    ("schedule", &[&[
        "schedule", "every day", "daily", "hourly", "weekly", "monthly", "every morning",
        "every hour", "every week", "every monday", "at 9am", "each day", "each morning",
        "once a day", "nightly", "every ",
    ]]),
    ("gmail_trigger", &[&[
        "new email", "email received", "emails received", "receive an email", "receive email",
        "receive a customer", "incoming email", "email arrives", "emails arrive", "inbox",
    ]]),
    ("form_trigger", &[&[
        "form submission", "form submitted", "form is submitted", "submits a form", "submission",
        "new form", "form response", "signup form", "sign-up form", "contact form",
    ]]),
    ("cron", &[&["cron"]]),
    ("manual", &[&["manually", "on demand", "button", "click"]]),
];

/// Action rules in tie-break order: `(key, any_of)`.
const ACTION_RULES: &[ActionSpec] = &[
    // Communication
    ("gmail", &[
        "send email", "send an email", "send a email", "sends email", "sends an email",
        "send emails", "email notification", "notify via email", "email to", "email the",
        "gmail", "auto-response", "reply email", "confirmation email", "thank-you email",
        "thank you email", "summary email", "reminder email", "welcome email", "via email",
        "by email",
    ]),
    ("email", &["smtp"]),
    ("slack", &["slack"]),
    ("twilio", &["sms", "text message", "twilio"]),
    ("discord", &["discord"]),
    ("telegram", &["telegram"]),
    ("teams", &["microsoft teams", "on teams", "to teams", "teams channel", "teams message"]),
    ("whatsapp", &["whatsapp"]),
    // Storage
    ("google_sheets", &[
        "google sheet", "spreadsheet", "another sheet", "to sheet", "to a sheet", "in sheets",
    ]),
    ("airtable", &["airtable"]),
    ("notion", &["notion"]),
    ("mongodb", &["mongodb", "mongo", "database", "store in db", "save to db"]),
    ("mysql", &["mysql"]),
    ("postgres", &["postgres"]),
    ("google_drive", &["google drive", "to drive", "in drive", "gdrive"]),
    ("dropbox", &["dropbox"]),
    ("aws_s3", &["aws s3", "amazon s3", "s3 bucket", "to s3"]),
    // CRM & support
    ("zendesk", &["zendesk", "support ticket", "create ticket", "create a ticket", "helpdesk ticket"]),
    ("hubspot", &["hubspot", "crm", "update customer"]),
    ("salesforce", &["salesforce", "opportunity"]),
    ("pipedrive", &["pipedrive"]),
    ("freshdesk", &["freshdesk"]),
    ("intercom", &["intercom"]),
    ("drift", &["drift"]),
    // Project management
    ("trello", &["trello", "create card", "create a card"]),
    ("asana", &["asana"]),
    ("clickup", &["clickup", "click up"]),
    ("jira", &["jira"]),
    ("linear", &["linear issue", "in linear", "linear ticket", "linear.app"]),
    ("monday", &["monday.com", "monday board"]),
    // Commerce
    ("stripe", &["stripe", "charge the customer", "charge customer", "refund"]),
    ("shopify", &["shopify"]),
    ("woocommerce", &["woocommerce"]),
    ("paypal", &["paypal"]),
    ("quickbooks", &["quickbooks", "accounting", "invoice"]),
    // Development
    ("github", &["github"]),
    ("gitlab", &["gitlab"]),
    ("http", &["http request", "api", "fetch", "rest endpoint", "call an endpoint", "external service"]),
    ("webhook_response", &[
        "respond to webhook", "respond to the webhook", "webhook response", "return a response",
        "reply to the request",
    ]),
    ("function", &["process", "transform", "analyze", "analyse", "validate", "custom function", "calculate"]),
    ("code", &["javascript", "python", "code node", "run code", "custom code", "script"]),
    // Marketing
    ("mailchimp", &["mailchimp", "email campaign", "newsletter", "email sequence"]),
    ("twitter", &["twitter", "tweet", "post to x"]),
    ("facebook", &["facebook"]),
    ("linkedin", &["linkedin"]),
    ("youtube", &["youtube"]),
    ("instagram", &["instagram"]),
    // AI & data
    ("openai", &[
        "openai", "chatgpt", "gpt", "with ai", "using ai", "ai summary", "summarize", "summarise",
        "translate", "llm",
    ]),
    ("anthropic", &["anthropic", "claude"]),
    ("pdf", &["pdf", "ocr", "extract text"]),
    ("json", &["parse json", "to json", "json file", "json payload"]),
    ("spreadsheet_file", &["csv", "excel", "xlsx"]),
    ("xml", &["xml"]),
    // Logic
    ("if", &["only if", "only when", "condition", "filter", "greater than", "less than", "more than", " > ", " < "]),
    ("switch", &["route by", "depending on", "switch"]),
    ("merge", &["merge", "combine"]),
    ("wait", &["wait", "delay", "pause for"]),
    ("set", &["set field", "set the field", "map fields", "rename field"]),
    ("item_lists", &["split into items", "split out", "item list", "for each item"]),
    ("date_time", &["format date", "date format", "convert date", "timestamp"]),
];

/// A precompiled, case-insensitive set of alternative phrases
struct PhraseSet {
    matcher: AhoCorasick,
}

impl PhraseSet {
    fn new(phrases: &[&str]) -> Self {
        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostFirst)
            .build(phrases)
            .expect("static phrase tables always compile");
        Self { matcher }
    }

    /// Span of the leftmost match
    fn first(&self, text: &str) -> Option<Range<usize>> {
        self.matcher.find(text).map(|m| m.range())
    }

    /// Leftmost match that doesn't overlap any of `claimed`
    fn first_unclaimed(&self, text: &str, claimed: &[Range<usize>]) -> Option<Range<usize>> {
        self.matcher
            .find_iter(text)
            .map(|m| m.range())
            .find(|span| !claimed.iter().any(|c| overlaps(c, span)))
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

struct TriggerRule {
    key: &'static str,
    all_of: Vec<PhraseSet>,
}

impl TriggerRule {
    /// Leftmost span of each phrase set, or `None` unless every set matches
    fn evidence(&self, text: &str) -> Option<Vec<Range<usize>>> {
        self.all_of.iter().map(|set| set.first(text)).collect()
    }
}

struct ActionRule {
    key: &'static str,
    phrases: PhraseSet,
}

struct RuleTable {
    triggers: Vec<TriggerRule>,
    actions: Vec<ActionRule>,
}

static RULES: Lazy<RuleTable> = Lazy::new(|| RuleTable {
    triggers: TRIGGER_RULES
        .iter()
        .map(|(key, sets)| TriggerRule {
            key: *key,
            all_of: sets.iter().map(|phrases| PhraseSet::new(phrases)).collect(),
        })
        .collect(),
    actions: ACTION_RULES
        .iter()
        .map(|(key, phrases)| ActionRule {
            key: *key,
            phrases: PhraseSet::new(phrases),
        })
        .collect(),
});

/// Result of classifying one prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// The single trigger key
    pub trigger: String,
    /// Action/logic keys in layout order
    pub actions: Vec<String>,
    /// No trigger rule matched and the default trigger was used
    pub trigger_defaulted: bool,
    /// Filler actions were appended because nothing actionable matched
    pub filler_added: bool,
    /// A matched key was dropped to respect [`MAX_ACTIONS`]
    pub truncated: bool,
}

impl Classification {
    /// Ordered key list: trigger first, then actions
    pub fn keys(&self) -> Vec<String> {
        std::iter::once(self.trigger.clone())
            .chain(self.actions.iter().cloned())
            .collect()
    }
}

/// Rule-based intent classifier
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    filler: Vec<String>,
}

impl IntentClassifier {
    /// Classifier that appends `filler` when a prompt has no actionable match.
    ///
    /// A single key gives the minimal two-node fallback; several keys give a
    /// multi-app template.
    pub fn new(filler: Vec<String>) -> Self {
        Self { filler }
    }

    pub fn filler(&self) -> &[String] {
        &self.filler
    }

    /// Classify a prompt. Never fails; the trigger is always present.
    pub fn classify(&self, prompt: &str) -> Classification {
        let rules = &*RULES;

        let matched_trigger = rules
            .triggers
            .iter()
            .find_map(|rule| rule.evidence(prompt).map(|spans| (rule.key, spans)));

        let (trigger, claimed, trigger_defaulted) = match matched_trigger {
            Some((key, spans)) => (key, spans, false),
            None => (DEFAULT_TRIGGER, Vec::new(), true),
        };

        // A phrase that already picked the trigger ("new row added to Google
        // Sheets") must not also spawn the same service as an action.
        let mut hits: Vec<(usize, &'static str)> = rules
            .actions
            .iter()
            .filter_map(|rule| {
                rule.phrases
                    .first_unclaimed(prompt, &claimed)
                    .map(|span| (span.start, rule.key))
            })
            .collect();
        hits.sort_by_key(|(offset, _)| *offset);

        let mut actions: Vec<String> = Vec::with_capacity(hits.len());
        for (_, key) in hits {
            if key != trigger && !actions.iter().any(|k| k == key) {
                actions.push(key.to_string());
            }
        }

        let matched = actions.clone();
        let filler_added = !actions.iter().any(|k| is_action(k));
        if filler_added {
            actions.truncate(MAX_ACTIONS.saturating_sub(self.filler.len()));
            for key in &self.filler {
                if !actions.contains(key) {
                    actions.push(key.clone());
                }
            }
        }
        actions.truncate(MAX_ACTIONS);
        let truncated = matched.iter().any(|key| !actions.contains(key));

        log::debug!(
            "Classified prompt: trigger={} (defaulted: {}), actions={:?}, filler: {}, truncated: {}",
            trigger,
            trigger_defaulted,
            actions,
            filler_added,
            truncated
        );

        Classification {
            trigger: trigger.to_string(),
            actions,
            trigger_defaulted,
            filler_added,
            truncated,
        }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(vec![DEFAULT_FILLER.to_string()])
    }
}

fn is_action(key: &str) -> bool {
    catalog()
        .get(key)
        .is_ok_and(|desc| desc.category == NodeCategory::Action)
}

/// Every key the rule tables can emit, for consistency checks
pub fn rule_keys() -> impl Iterator<Item = &'static str> {
    TRIGGER_RULES
        .iter()
        .map(|(key, _)| *key)
        .chain(ACTION_RULES.iter().map(|(key, _)| *key))
        .chain([DEFAULT_TRIGGER, DEFAULT_FILLER])
}
