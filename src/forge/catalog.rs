// SPDX-License-Identifier: MIT

//! Node catalog - the static registry of n8n node descriptors
//!
//! The catalog is built once on first use and never mutated afterwards, so it
//! can be shared by reference between any number of concurrent requests.
//! Adding a service means adding one entry to [`build_entries`]; the
//! classifier, synthesizer and resolver only ever read descriptors.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::error::{FlowForgeError, Result};

/// Namespace every n8n core node type lives in
pub const WIRE_TYPE_PREFIX: &str = "n8n-nodes-base.";

/// Uncatalogued core node types that run without credentials
const CREDENTIAL_FREE_TYPES: &[&str] = &[
    "noOp", "stickyNote", "start", "interval", "errorTrigger", "executeWorkflow",
    "executeWorkflowTrigger", "rssFeedRead", "rssFeedReadTrigger", "localFileTrigger",
    "functionItem", "filter", "sort", "limit", "aggregate", "summarize", "splitOut",
    "splitInBatches", "removeDuplicates", "renameKeys", "compareDatasets", "html", "markdown",
    "crypto", "compression", "moveBinaryData", "convertToFile", "extractFromFile",
    "readBinaryFile", "readBinaryFiles", "writeBinaryFile", "executeCommand",
];

/// Role of a node inside a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    Trigger,
    Action,
    Logic,
}

/// Service family a node belongs to, used for catalog listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceGroup {
    Trigger,
    Communication,
    Storage,
    Crm,
    Project,
    Commerce,
    Development,
    Marketing,
    Data,
    Utility,
}

/// Immutable description of one n8n node type
#[derive(Debug, Clone, Serialize)]
pub struct NodeDescriptor {
    pub key: &'static str,
    pub wire_type: String,
    pub category: NodeCategory,
    pub group: ServiceGroup,
    pub display_name: &'static str,
    pub requires_credential: bool,
    pub default_parameters: Map<String, Value>,
}

impl NodeDescriptor {
    pub fn is_trigger(&self) -> bool {
        self.category == NodeCategory::Trigger
    }
}

/// Read-only registry of node descriptors, indexed by key and by wire type
pub struct NodeCatalog {
    entries: Vec<NodeDescriptor>,
    by_key: HashMap<&'static str, usize>,
    by_wire_type: HashMap<String, usize>,
}

static CATALOG: Lazy<NodeCatalog> = Lazy::new(|| NodeCatalog::from_entries(build_entries()));

/// The process-wide catalog
pub fn catalog() -> &'static NodeCatalog {
    &CATALOG
}

impl NodeCatalog {
    fn from_entries(entries: Vec<NodeDescriptor>) -> Self {
        let mut by_key = HashMap::with_capacity(entries.len());
        let mut by_wire_type = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            by_key.insert(entry.key, idx);
            by_wire_type.insert(entry.wire_type.clone(), idx);
        }
        Self {
            entries,
            by_key,
            by_wire_type,
        }
    }

    /// Look up a descriptor by catalog key
    pub fn get(&self, key: &str) -> Result<&NodeDescriptor> {
        self.by_key
            .get(key)
            .map(|&idx| &self.entries[idx])
            .ok_or_else(|| FlowForgeError::catalog_lookup(key))
    }

    /// Look up a descriptor by its full wire type (`n8n-nodes-base.slack`)
    pub fn by_wire_type(&self, wire_type: &str) -> Option<&NodeDescriptor> {
        self.by_wire_type.get(wire_type).map(|&idx| &self.entries[idx])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Trigger membership test used by the validator.
    ///
    /// Catalog triggers (`webhook`, `cron`, ...) count, as does any core node
    /// whose local name ends in `Trigger` even if the catalog doesn't list it.
    pub fn is_trigger_type(&self, wire_type: &str) -> bool {
        if let Some(desc) = self.by_wire_type(wire_type) {
            return desc.is_trigger();
        }
        wire_type
            .strip_prefix(WIRE_TYPE_PREFIX)
            .is_some_and(|local| local.ends_with("Trigger"))
    }

    /// Whether nodes of this wire type need external credentials.
    ///
    /// Core nodes the catalog doesn't list are assumed to talk to an external
    /// service unless their local name is a known built-in utility.
    pub fn requires_credential(&self, wire_type: &str) -> bool {
        if let Some(desc) = self.by_wire_type(wire_type) {
            return desc.requires_credential;
        }
        wire_type
            .strip_prefix(WIRE_TYPE_PREFIX)
            .is_some_and(|local| !CREDENTIAL_FREE_TYPES.contains(&local))
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.entries.iter()
    }

    pub fn triggers(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.entries.iter().filter(|d| d.is_trigger())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn node(
    key: &'static str,
    local_type: &str,
    category: NodeCategory,
    group: ServiceGroup,
    display_name: &'static str,
    requires_credential: bool,
    defaults: Value,
) -> NodeDescriptor {
    NodeDescriptor {
        key,
        wire_type: format!("{}{}", WIRE_TYPE_PREFIX, local_type),
        category,
        group,
        display_name,
        requires_credential,
        default_parameters: params(defaults),
    }
}

#[rustfmt::skip]
fn build_entries() -> Vec<NodeDescriptor> {
    use NodeCategory::{Action, Logic, Trigger};
    use ServiceGroup as G;

    vec![
        // Triggers
        node("webhook", "webhook", Trigger, G::Trigger, "Webhook", false,
            json!({"path": "automation", "httpMethod": "POST", "responseMode": "lastNode"})),
        node("manual", "manualTrigger", Trigger, G::Trigger, "Manual Trigger", false, json!({})),
        node("schedule", "scheduleTrigger", Trigger, G::Trigger, "Schedule Trigger", false,
            json!({"rule": {"interval": [{"field": "hours", "hoursInterval": 24}]}})),
        node("cron", "cron", Trigger, G::Trigger, "Cron", false,
            json!({"triggerTimes": {"item": [{"mode": "everyDay", "hour": 9}]}})),
        node("gmail_trigger", "gmailTrigger", Trigger, G::Trigger, "Gmail Trigger", true,
            json!({"pollTimes": {"item": [{"mode": "everyMinute"}]}, "filters": {}})),
        node("sheets_trigger", "googleSheetsTrigger", Trigger, G::Trigger, "Google Sheets Trigger", true,
            json!({"event": "rowAdded", "documentId": "REPLACE_WITH_SHEET_ID", "sheetName": "Sheet1"})),
        node("github_trigger", "githubTrigger", Trigger, G::Trigger, "GitHub Trigger", true,
            json!({"owner": "REPLACE_WITH_OWNER", "repository": "REPLACE_WITH_REPOSITORY", "events": ["issues"]})),
        node("form_trigger", "formTrigger", Trigger, G::Trigger, "Form Trigger", false,
            json!({"formTitle": "Automation form", "formFields": {"values": []}})),
        node("stripe_trigger", "stripeTrigger", Trigger, G::Trigger, "Stripe Trigger", true,
            json!({"events": ["payment_intent.succeeded"]})),
        // Communication
        node("gmail", "gmail", Action, G::Communication, "Gmail", true,
            json!({"resource": "message", "operation": "send", "to": "you@example.com",
                   "subject": "Automated notification",
                   "message": "This is an automated message from your workflow."})),
        node("email", "emailSend", Action, G::Communication, "Send Email", true,
            json!({"fromEmail": "workflow@example.com", "toEmail": "you@example.com",
                   "subject": "Automated notification", "text": "This is an automated message from your workflow."})),
        node("slack", "slack", Action, G::Communication, "Slack", true,
            json!({"resource": "message", "operation": "post", "channel": "#general",
                   "text": "Automated notification"})),
        node("discord", "discord", Action, G::Communication, "Discord", true,
            json!({"resource": "message", "operation": "send", "channelId": "REPLACE_WITH_CHANNEL_ID",
                   "text": "Automated notification"})),
        node("telegram", "telegram", Action, G::Communication, "Telegram", true,
            json!({"resource": "message", "operation": "sendMessage", "chatId": "REPLACE_WITH_CHAT_ID",
                   "text": "Automated notification"})),
        node("twilio", "twilio", Action, G::Communication, "Twilio", true,
            json!({"resource": "sms", "operation": "send", "from": "+10000000000", "to": "+1234567890",
                   "message": "Automated alert from your workflow"})),
        node("teams", "microsoftTeams", Action, G::Communication, "Microsoft Teams", true,
            json!({"resource": "channelMessage", "operation": "create", "teamId": "REPLACE_WITH_TEAM_ID",
                   "channelId": "REPLACE_WITH_CHANNEL_ID", "message": "Automated notification"})),
        node("whatsapp", "whatsApp", Action, G::Communication, "WhatsApp", true,
            json!({"operation": "send", "phoneNumberId": "REPLACE_WITH_PHONE_NUMBER_ID",
                   "recipientPhoneNumber": "+1234567890", "textBody": "Automated notification"})),
        // Storage
        node("google_sheets", "googleSheets", Action, G::Storage, "Google Sheets", true,
            json!({"resource": "sheet", "operation": "append", "documentId": "REPLACE_WITH_SHEET_ID",
                   "sheetName": "Sheet1"})),
        node("airtable", "airtable", Action, G::Storage, "Airtable", true,
            json!({"operation": "create", "resource": "row", "baseId": "REPLACE_WITH_BASE_ID",
                   "table": "REPLACE_WITH_TABLE"})),
        node("notion", "notion", Action, G::Storage, "Notion", true,
            json!({"resource": "databasePage", "operation": "create", "databaseId": "REPLACE_WITH_DATABASE_ID"})),
        node("mongodb", "mongoDb", Action, G::Storage, "MongoDB", true,
            json!({"operation": "insert", "collection": "automation"})),
        node("mysql", "mySql", Action, G::Storage, "MySQL", true,
            json!({"operation": "insert", "table": "automation"})),
        node("postgres", "postgres", Action, G::Storage, "Postgres", true,
            json!({"operation": "insert", "schema": "public", "table": "automation"})),
        node("google_drive", "googleDrive", Action, G::Storage, "Google Drive", true,
            json!({"operation": "upload", "name": "automation-output"})),
        node("dropbox", "dropbox", Action, G::Storage, "Dropbox", true,
            json!({"operation": "upload", "path": "/automation"})),
        node("aws_s3", "awsS3", Action, G::Storage, "AWS S3", true,
            json!({"operation": "upload", "bucketName": "REPLACE_WITH_BUCKET", "fileName": "automation-output"})),
        // CRM & support
        node("hubspot", "hubspot", Action, G::Crm, "HubSpot", true,
            json!({"resource": "contact", "operation": "upsert", "email": "contact@example.com"})),
        node("salesforce", "salesforce", Action, G::Crm, "Salesforce", true,
            json!({"resource": "lead", "operation": "create", "company": "REPLACE_WITH_COMPANY",
                   "lastname": "REPLACE_WITH_LAST_NAME"})),
        node("pipedrive", "pipedrive", Action, G::Crm, "Pipedrive", true,
            json!({"resource": "deal", "operation": "create", "title": "New deal"})),
        node("zendesk", "zendesk", Action, G::Crm, "Zendesk", true,
            json!({"resource": "ticket", "operation": "create", "description": "Customer Support Request",
                   "priority": "normal"})),
        node("freshdesk", "freshdesk", Action, G::Crm, "Freshdesk", true,
            json!({"resource": "ticket", "operation": "create", "requester": "email",
                   "requesterIdentificationValue": "customer@example.com"})),
        node("intercom", "intercom", Action, G::Crm, "Intercom", true,
            json!({"resource": "user", "operation": "create"})),
        node("drift", "drift", Action, G::Crm, "Drift", true,
            json!({"resource": "contact", "operation": "create", "email": "contact@example.com"})),
        // Project management
        node("trello", "trello", Action, G::Project, "Trello", true,
            json!({"resource": "card", "operation": "create", "listId": "REPLACE_WITH_LIST_ID",
                   "name": "New card"})),
        node("asana", "asana", Action, G::Project, "Asana", true,
            json!({"resource": "task", "operation": "create", "workspace": "REPLACE_WITH_WORKSPACE_ID",
                   "name": "New task"})),
        node("clickup", "clickUp", Action, G::Project, "ClickUp", true,
            json!({"resource": "task", "operation": "create", "list": "REPLACE_WITH_LIST_ID",
                   "name": "New task"})),
        node("jira", "jira", Action, G::Project, "Jira", true,
            json!({"resource": "issue", "operation": "create", "project": "REPLACE_WITH_PROJECT",
                   "issueType": "Task", "summary": "New issue"})),
        node("linear", "linear", Action, G::Project, "Linear", true,
            json!({"resource": "issue", "operation": "create", "teamId": "REPLACE_WITH_TEAM_ID",
                   "title": "New issue"})),
        node("monday", "mondayCom", Action, G::Project, "Monday.com", true,
            json!({"resource": "boardItem", "operation": "create", "boardId": "REPLACE_WITH_BOARD_ID",
                   "name": "New item"})),
        // Commerce & payments
        node("stripe", "stripe", Action, G::Commerce, "Stripe", true,
            json!({"resource": "customer", "operation": "get"})),
        node("shopify", "shopify", Action, G::Commerce, "Shopify", true,
            json!({"resource": "order", "operation": "getAll"})),
        node("woocommerce", "wooCommerce", Action, G::Commerce, "WooCommerce", true,
            json!({"resource": "order", "operation": "getAll"})),
        node("paypal", "payPal", Action, G::Commerce, "PayPal", true,
            json!({"resource": "payout", "operation": "get"})),
        node("quickbooks", "quickbooks", Action, G::Commerce, "QuickBooks", true,
            json!({"resource": "invoice", "operation": "create"})),
        // Development & APIs
        node("github", "github", Action, G::Development, "GitHub", true,
            json!({"resource": "issue", "operation": "create", "owner": "REPLACE_WITH_OWNER",
                   "repository": "REPLACE_WITH_REPOSITORY", "title": "New issue"})),
        node("gitlab", "gitlab", Action, G::Development, "GitLab", true,
            json!({"resource": "issue", "operation": "create", "owner": "REPLACE_WITH_OWNER",
                   "repository": "REPLACE_WITH_REPOSITORY", "title": "New issue"})),
        node("http", "httpRequest", Action, G::Development, "HTTP Request", true,
            json!({"method": "POST", "url": ""})),
        node("webhook_response", "respondToWebhook", Action, G::Development, "Respond to Webhook", false,
            json!({"respondWith": "firstIncomingItem"})),
        node("function", "function", Action, G::Development, "Function", false,
            json!({"functionCode": "return items;"})),
        node("code", "code", Action, G::Development, "Code", false,
            json!({"jsCode": "return $input.all();"})),
        // Marketing & social
        node("mailchimp", "mailchimp", Action, G::Marketing, "Mailchimp", true,
            json!({"resource": "member", "operation": "create", "list": "REPLACE_WITH_LIST_ID",
                   "email": "subscriber@example.com", "status": "subscribed"})),
        node("twitter", "twitter", Action, G::Marketing, "Twitter", true,
            json!({"operation": "create", "text": "Automated update"})),
        node("facebook", "facebookGraphApi", Action, G::Marketing, "Facebook Graph API", true,
            json!({"httpRequestMethod": "GET", "node": "me"})),
        node("linkedin", "linkedIn", Action, G::Marketing, "LinkedIn", true,
            json!({"operation": "create", "text": "Automated update"})),
        node("youtube", "youTube", Action, G::Marketing, "YouTube", true,
            json!({"resource": "video", "operation": "getAll"})),
        node("instagram", "instagram", Action, G::Marketing, "Instagram", true,
            json!({"resource": "image", "operation": "publish", "caption": "Automated update"})),
        // AI & data processing
        node("openai", "openAi", Action, G::Data, "OpenAI", true,
            json!({"resource": "text", "operation": "complete", "prompt": "Summarize the input"})),
        node("anthropic", "anthropic", Action, G::Data, "Anthropic", true,
            json!({"operation": "message", "prompt": "Summarize the input"})),
        node("pdf", "pdf", Action, G::Data, "PDF", false, json!({"operation": "extractText"})),
        node("json", "json", Action, G::Data, "JSON", false, json!({"operation": "parse"})),
        node("spreadsheet_file", "spreadsheetFile", Action, G::Data, "Spreadsheet File", false,
            json!({"operation": "fromFile"})),
        node("xml", "xml", Action, G::Data, "XML", false, json!({"mode": "jsonToxml"})),
        // Logic & utilities
        node("if", "if", Logic, G::Utility, "IF", false, json!({"conditions": {}})),
        node("switch", "switch", Logic, G::Utility, "Switch", false,
            json!({"dataType": "string", "rules": {"rules": []}})),
        node("merge", "merge", Logic, G::Utility, "Merge", false, json!({"mode": "append"})),
        node("wait", "wait", Logic, G::Utility, "Wait", false, json!({"amount": 1, "unit": "hours"})),
        node("set", "set", Logic, G::Utility, "Set", false, json!({"values": {}})),
        node("item_lists", "itemLists", Logic, G::Utility, "Item Lists", false,
            json!({"operation": "splitOutItems"})),
        node("date_time", "dateTime", Logic, G::Utility, "Date & Time", false,
            json!({"action": "format"})),
    ]
}
