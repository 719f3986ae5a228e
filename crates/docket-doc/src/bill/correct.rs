//! # Invoice Corrections
//!
//! Turns an issued invoice into a corrective document (credit note, debit
//! note, corrective invoice) that cites the original in `preceding`.
//!
//! What a correction needs is decided by the merged
//! [`CorrectionDefinition`] of the invoice's regime and addons: the types
//! allowed, extensions that must be supplied, whether a reason is required
//! and which head stamps of the original must be carried over.

use chrono::NaiveDate;
use docket_core::{Extensions, FieldErrors, Key};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::Invoice;
use crate::defs::ext::require_extensions;
use crate::defs::{CorrectionDefinition, ExtensionDef};
use crate::head::Stamp;
use crate::org::DocumentRef;
use crate::schema;

/// Options for [`correct`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectionOptions {
    /// Type of the corrective document.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Key>,
    /// Issue date of the corrective document; today when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,
    /// Series for the corrective document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    /// Why the correction is issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Stamps from the original envelope head.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stamps: Vec<Stamp>,
    /// Extensions describing the correction.
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
    /// Copy the original's tax totals into the preceding reference.
    #[serde(default)]
    pub copy_tax: bool,
}

impl CorrectionOptions {
    /// Options for a correction of type `kind`.
    pub fn of_type(kind: &str) -> Self {
        Self {
            kind: Some(Key::from(kind)),
            ..Default::default()
        }
    }
}

/// Correct `inv` in place. The caller recalculates afterwards.
pub fn correct(
    inv: &mut Invoice,
    def: &CorrectionDefinition,
    opts: &CorrectionOptions,
    today: NaiveDate,
) -> Result<(), FieldErrors> {
    let kind = match &opts.kind {
        None => return Err(FieldErrors::single("type", "missing correction type")),
        Some(k) if k.is_empty() => return Err(FieldErrors::single("type", "missing correction type")),
        Some(k) if !k.is_in(&def.types) => {
            return Err(FieldErrors::single("type", "invalid correction type"))
        }
        Some(k) => k.clone(),
    };

    let code = inv.code.clone().unwrap_or_default();
    if code.is_empty() {
        return Err(FieldErrors::single("code", "cannot correct an invoice without a code"));
    }

    let mut errs = FieldErrors::new();
    if def.reason_required && opts.reason.as_deref().map_or(true, |r| r.trim().is_empty()) {
        errs.add("reason", "missing corrective reason");
    }
    let mut stamps = Vec::new();
    for prv in &def.stamps {
        match opts.stamps.iter().find(|s| s.prv == *prv) {
            Some(s) => stamps.push(s.clone()),
            None => errs.add("stamps", format!("missing {prv} stamp")),
        }
    }
    let required: Vec<&str> = def.extensions.iter().map(Key::as_str).collect();
    errs.nest("ext", require_extensions(&opts.ext, &required));
    errs.into_result()?;

    let preceding = DocumentRef {
        uuid: inv.uuid,
        kind: Some(inv.kind.clone()),
        issue_date: inv.issue_date,
        series: inv.series.clone(),
        code,
        reason: opts.reason.clone(),
        stamps,
        tax: if def.copy_tax || opts.copy_tax {
            inv.totals.as_ref().and_then(|t| t.taxes.clone())
        } else {
            None
        },
        ext: opts.ext.clone(),
    };

    inv.preceding = vec![preceding];
    inv.uuid = None;
    inv.kind = kind;
    if opts.series.is_some() {
        inv.series = opts.series.clone();
    }
    inv.code = None;
    inv.issue_date = Some(opts.issue_date.unwrap_or(today));
    inv.totals = None;
    if let Some(p) = &mut inv.payment {
        p.advances.clear();
    }
    Ok(())
}

/// JSON Schema describing the options a correction accepts under `def`.
/// `ext_def` resolves extension keys to their definitions for labels and
/// code lists.
pub fn options_schema<'a>(
    def: &CorrectionDefinition,
    ext_def: impl Fn(&str) -> Option<&'a ExtensionDef>,
) -> Value {
    let types: Vec<Value> = def
        .types
        .iter()
        .map(|t| json!({"const": t.as_str(), "title": title_case(t.as_str())}))
        .collect();

    let mut ext_props = Map::new();
    for key in &def.extensions {
        let mut prop = json!({"type": "string"});
        if let Some(d) = ext_def(key.as_str()) {
            prop["title"] = json!(d.name);
            if let Some(desc) = &d.desc {
                prop["description"] = json!(desc);
            }
            if !d.values.is_empty() {
                let codes: Vec<Value> = d
                    .values
                    .iter()
                    .map(|c| json!({"const": c.code, "title": c.name}))
                    .collect();
                prop["oneOf"] = Value::Array(codes);
            }
        }
        ext_props.insert(key.to_string(), prop);
    }

    let mut ext = json!({
        "type": "object",
        "title": "Extensions",
        "properties": Value::Object(ext_props),
    });
    if !def.extensions.is_empty() {
        ext["required"] = json!(def.extensions);
    }

    let mut required = vec!["type"];
    if def.reason_required {
        required.push("reason");
    }
    if !def.extensions.is_empty() {
        required.push("ext");
    }
    if !def.stamps.is_empty() {
        required.push("stamps");
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": schema::CORRECTION_OPTIONS,
        "title": "Correction Options",
        "type": "object",
        "properties": {
            "type": {"type": "string", "title": "Type", "oneOf": types},
            "issue_date": {"type": "string", "format": "date", "title": "Issue Date"},
            "series": {"type": "string", "title": "Series"},
            "reason": {"type": "string", "title": "Reason"},
            "stamps": {"type": "array", "title": "Stamps", "items": {"$ref": schema::STAMP}},
            "ext": ext,
            "copy_tax": {"type": "boolean", "title": "Copy Tax Totals"},
        },
        "required": required,
    })
}

fn title_case(key: &str) -> String {
    key.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
