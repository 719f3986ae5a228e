//! # Documents
//!
//! The closed set of document kinds an envelope may carry, selected by the
//! value's `$schema`. Each kind advertises what it can do: invoices are
//! calculable, correctable and replicable; messages only validate.

use chrono::NaiveDate;
use docket_core::{DocketError, FieldErrors};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::bill::{self, CorrectionOptions, Invoice};
use crate::calculator;
use crate::note::Message;
use crate::registry::Registry;
use crate::schema;
use crate::validate::validate_invoice;

/// A parsed document.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// `bill/invoice`.
    Invoice(Box<Invoice>),
    /// `note/message`.
    Message(Message),
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Invoice(inv) => inv.serialize(serializer),
            Self::Message(msg) => msg.serialize(serializer),
        }
    }
}

impl From<Invoice> for Document {
    fn from(inv: Invoice) -> Self {
        Self::Invoice(Box::new(inv))
    }
}

impl From<Message> for Document {
    fn from(msg: Message) -> Self {
        Self::Message(msg)
    }
}

impl Document {
    /// Decode a value by its `$schema`.
    ///
    /// # Errors
    ///
    /// `UnknownSchema` when `$schema` is missing or names no document;
    /// `BadRequest` when the value does not fit the schema's shape.
    pub fn from_value(value: Value) -> Result<Self, DocketError> {
        let id = value
            .get("$schema")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let invalid = |e: serde_json::Error| DocketError::BadRequest(format!("invalid document: {e}"));
        match id.as_str() {
            schema::INVOICE => Ok(Self::Invoice(Box::new(
                serde_json::from_value(value).map_err(invalid)?,
            ))),
            schema::MESSAGE => Ok(Self::Message(serde_json::from_value(value).map_err(invalid)?)),
            "" => Err(DocketError::UnknownSchema("missing $schema".into())),
            other => Err(DocketError::UnknownSchema(other.to_string())),
        }
    }

    /// Schema identity.
    pub fn schema(&self) -> &str {
        match self {
            Self::Invoice(inv) => &inv.schema,
            Self::Message(msg) => &msg.schema,
        }
    }

    /// The invoice, if this is one.
    pub fn as_invoice(&self) -> Option<&Invoice> {
        match self {
            Self::Invoice(inv) => Some(inv),
            Self::Message(_) => None,
        }
    }

    /// Run the calculator pipeline. Messages are only normalized and
    /// validated.
    pub fn calculate(&mut self, registry: &Registry) -> Result<(), DocketError> {
        self.calculate_on(registry, calculator::today())
    }

    /// [`calculate`](Self::calculate) with an explicit "today".
    pub fn calculate_on(&mut self, registry: &Registry, today: NaiveDate) -> Result<(), DocketError> {
        match self {
            Self::Invoice(inv) => calculator::calculate_on(inv, registry, today),
            Self::Message(msg) => {
                msg.normalize();
                if msg.uuid.is_none() {
                    msg.uuid = Some(docket_core::new_document_uuid());
                }
                msg.validate().into_result().map_err(DocketError::from)
            }
        }
    }

    /// Validation without modification.
    pub fn validate(&self, registry: &Registry) -> FieldErrors {
        match self {
            Self::Invoice(inv) => {
                let ctx = registry.context(inv.regime_code(), &inv.addons);
                validate_invoice(inv, &ctx)
            }
            Self::Message(msg) => msg.validate(),
        }
    }

    /// Turn an invoice into its correction and recalculate.
    ///
    /// # Errors
    ///
    /// `Validation` with the failing option under its field name, or
    /// `BadRequest` for documents that cannot be corrected.
    pub fn correct(&mut self, registry: &Registry, opts: &CorrectionOptions) -> Result<(), DocketError> {
        self.correct_on(registry, opts, calculator::today())
    }

    /// [`correct`](Self::correct) with an explicit "today".
    pub fn correct_on(
        &mut self,
        registry: &Registry,
        opts: &CorrectionOptions,
        today: NaiveDate,
    ) -> Result<(), DocketError> {
        let inv = match self {
            Self::Invoice(inv) => inv,
            Self::Message(_) => {
                return Err(DocketError::BadRequest("document cannot be corrected".into()))
            }
        };
        let def = {
            let ctx = registry.context(inv.regime_code(), &inv.addons);
            ctx.correction(schema::SHORT_INVOICE)
        };
        let def = def.ok_or_else(|| FieldErrors::single("type", "invalid correction type"))?;
        bill::correct::correct(inv, &def, opts, today)?;
        calculator::calculate_on(inv, registry, today)
    }

    /// JSON Schema of the correction options this document accepts.
    pub fn correction_options_schema(&self, registry: &Registry) -> Result<Value, DocketError> {
        let inv = self
            .as_invoice()
            .ok_or_else(|| DocketError::BadRequest("document cannot be corrected".into()))?;
        let ctx = registry.context(inv.regime_code(), &inv.addons);
        let def = ctx
            .correction(schema::SHORT_INVOICE)
            .ok_or_else(|| DocketError::from(FieldErrors::single("type", "invalid correction type")))?;
        Ok(bill::correct::options_schema(&def, |k| ctx.extension(k)))
    }

    /// A copy ready to be issued again.
    pub fn replicate(&self) -> Self {
        match self {
            Self::Invoice(inv) => Self::Invoice(Box::new(inv.replicate())),
            Self::Message(msg) => Self::Message(Message {
                uuid: None,
                ..msg.clone()
            }),
        }
    }
}
