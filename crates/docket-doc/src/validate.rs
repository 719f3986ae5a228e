//! # Validator Dispatch
//!
//! Same walk as the normalizer, collecting a [`FieldErrors`] tree instead
//! of changing anything. For each visited value the checks run in this
//! order and are merged under the field path that led to the value:
//!
//! 1. the type's intrinsic rules (required fields, category and rate
//!    membership for combos);
//! 2. extension values against their definitions (`undefined`,
//!    `code 'x' invalid`, `does not match pattern`);
//! 3. each applicable hook, regime first then addons.
//!
//! Siblings never short-circuit each other. A value that is structurally
//! missing (`cannot be blank`) is not descended into.

use docket_core::{Extensions, FieldErrors};

use crate::bill::{self, types, Charge, Invoice, Line, PaymentDetails};
use crate::defs::ext::validate_extensions;
use crate::hooks::NodeRef;
use crate::org::{Address, DocumentRef, Item, Party};
use crate::registry::RuleContext;
use crate::schema;
use crate::tax::Combo;

pub(crate) const REQUIRED: &str = "cannot be blank";
pub(crate) const INVALID: &str = "must be a valid value";

fn hooks(ctx: &RuleContext<'_>, node: NodeRef<'_>) -> FieldErrors {
    let mut errs = FieldErrors::new();
    for h in ctx.hooks() {
        errs.merge(h.validate(node));
    }
    errs
}

fn extensions(ext: &Extensions, ctx: &RuleContext<'_>) -> FieldErrors {
    validate_extensions(ext, |k| ctx.extension(k))
}

/// Validate an invoice and everything in it.
pub fn validate_invoice(inv: &Invoice, ctx: &RuleContext<'_>) -> FieldErrors {
    let mut errs = ctx.unknown_errors();

    if inv.schema != schema::INVOICE {
        errs.add("$schema", INVALID);
    }
    if !types::ALL.iter().any(|t| inv.kind == *t) {
        errs.add("type", INVALID);
    }
    let unknown: Vec<String> = inv
        .tags
        .iter()
        .filter(|tag| {
            bill::default_tags().get(tag.as_str()).is_none()
                && ctx.tag(schema::SHORT_INVOICE, tag.as_str()).is_none()
        })
        .map(|tag| format!("'{tag}'"))
        .collect();
    if !unknown.is_empty() {
        errs.add("$tags", format!("{} undefined", unknown.join(", ")));
    }
    match &inv.currency {
        None => errs.add("currency", REQUIRED),
        Some(c) if !c.is_known() => errs.add("currency", INVALID),
        Some(_) => {}
    }
    if inv.issue_date.is_none() {
        errs.add("issue_date", REQUIRED);
    }
    if inv.totals.is_none() {
        errs.add("totals", REQUIRED);
    }

    if let Some(tax) = &inv.tax {
        let mut terrs = FieldErrors::new();
        if let Some(code) = &tax.prices_include {
            if ctx.regime.and_then(|r| r.category(code.as_str())).is_none() {
                terrs.add("prices_include", format!("'{code}' not defined in regime"));
            }
        }
        terrs.nest("ext", extensions(&tax.ext, ctx));
        errs.nest("tax", terrs);
    }

    if inv.is_correction() && inv.preceding.is_empty() {
        errs.add("preceding", REQUIRED);
    }
    let mut perrs = FieldErrors::new();
    for (i, pre) in inv.preceding.iter().enumerate() {
        perrs.nest(i.to_string(), validate_preceding(pre, ctx));
    }
    errs.nest("preceding", perrs);

    match &inv.supplier {
        None => errs.add("supplier", REQUIRED),
        Some(p) => errs.nest("supplier", validate_party(p, ctx)),
    }
    if let Some(p) = &inv.customer {
        errs.nest("customer", validate_party(p, ctx));
    }

    if inv.lines.is_empty() && inv.kind != types::PROFORMA {
        errs.add("lines", REQUIRED);
    }
    let mut lerrs = FieldErrors::new();
    for (i, line) in inv.lines.iter().enumerate() {
        lerrs.nest(i.to_string(), validate_line(line, ctx));
    }
    errs.nest("lines", lerrs);

    let mut cerrs = FieldErrors::new();
    for (i, ch) in inv.charges.iter().enumerate() {
        cerrs.nest(i.to_string(), validate_charge(ch, ctx));
    }
    errs.nest("charges", cerrs);

    if let Some(pay) = &inv.payment {
        errs.nest("payment", validate_payment(pay, ctx));
    }

    errs.merge(hooks(ctx, NodeRef::Invoice(inv)));
    errs
}

/// Validate a supplier or customer.
pub fn validate_party(p: &Party, ctx: &RuleContext<'_>) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if p.name.is_empty() {
        errs.add("name", REQUIRED);
    }
    if let Some(tid) = &p.tax_id {
        let mut terrs = FieldErrors::new();
        if tid.country.is_empty() {
            terrs.add("country", REQUIRED);
        }
        terrs.merge(hooks(ctx, NodeRef::TaxIdentity(tid)));
        errs.nest("tax_id", terrs);
    }
    let mut ierrs = FieldErrors::new();
    for (i, id) in p.identities.iter().enumerate() {
        let mut e = FieldErrors::new();
        if id.code.is_empty() {
            e.add("code", REQUIRED);
        }
        e.nest("ext", extensions(&id.ext, ctx));
        ierrs.nest(i.to_string(), e);
    }
    errs.nest("identities", ierrs);

    let mut aerrs = FieldErrors::new();
    for (i, a) in p.addresses.iter().enumerate() {
        aerrs.nest(i.to_string(), validate_address(a, ctx));
    }
    errs.nest("addresses", aerrs);

    let mut eerrs = FieldErrors::new();
    for (i, e) in p.emails.iter().enumerate() {
        if !e.addr.contains('@') {
            eerrs.nest(i.to_string(), FieldErrors::single("addr", "must be a valid email address"));
        }
    }
    errs.nest("emails", eerrs);

    let mut terrs = FieldErrors::new();
    for (i, t) in p.telephones.iter().enumerate() {
        let mut e = FieldErrors::new();
        if t.num.is_empty() {
            e.add("num", REQUIRED);
        }
        e.merge(hooks(ctx, NodeRef::Telephone(t)));
        terrs.nest(i.to_string(), e);
    }
    errs.nest("telephones", terrs);

    if let Some(r) = &p.registration {
        errs.nest("registration", hooks(ctx, NodeRef::Registration(r)));
    }
    errs.nest("ext", extensions(&p.ext, ctx));
    errs.merge(hooks(ctx, NodeRef::Party(p)));
    errs
}

fn validate_address(a: &Address, ctx: &RuleContext<'_>) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if a.country.as_ref().is_some_and(|c| c.as_str().len() != 2) {
        errs.add("country", INVALID);
    }
    errs.merge(hooks(ctx, NodeRef::Address(a)));
    errs
}

fn validate_preceding(pre: &DocumentRef, ctx: &RuleContext<'_>) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if pre.code.is_empty() {
        errs.add("code", REQUIRED);
    }
    errs.nest("ext", extensions(&pre.ext, ctx));
    errs.merge(hooks(ctx, NodeRef::Preceding(pre)));
    errs
}

fn validate_line(line: &Line, ctx: &RuleContext<'_>) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if line.quantity.is_none() {
        errs.add("quantity", REQUIRED);
    }
    match &line.item {
        None => errs.add("item", REQUIRED),
        Some(item) => errs.nest("item", validate_item(item, ctx)),
    }
    errs.nest("taxes", validate_combos(&line.taxes, ctx));
    errs.merge(hooks(ctx, NodeRef::Line(line)));
    errs
}

fn validate_item(item: &Item, ctx: &RuleContext<'_>) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if item.name.is_empty() {
        errs.add("name", REQUIRED);
    }
    if item.price.is_none() {
        errs.add("price", REQUIRED);
    }
    errs.nest("ext", extensions(&item.ext, ctx));
    errs.merge(hooks(ctx, NodeRef::Item(item)));
    errs
}

fn validate_charge(ch: &Charge, ctx: &RuleContext<'_>) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if ch.percent.is_some() && ch.base.is_some_and(|b| b.is_zero()) {
        errs.add("base", "must not be zero when a percent is set");
    }
    errs.nest("taxes", validate_combos(&ch.taxes, ctx));
    errs.nest("ext", extensions(&ch.ext, ctx));
    errs.merge(hooks(ctx, NodeRef::Charge(ch)));
    errs
}

fn validate_combos(combos: &[Combo], ctx: &RuleContext<'_>) -> FieldErrors {
    let mut errs = FieldErrors::new();
    for (i, c) in combos.iter().enumerate() {
        if combos[..i].iter().any(|o| o.cat == c.cat) {
            errs.nest(i.to_string(), FieldErrors::single("cat", "duplicated"));
            continue;
        }
        errs.nest(i.to_string(), validate_combo(c, ctx));
    }
    errs
}

/// Validate one tax combo against the regime's categories.
pub fn validate_combo(c: &Combo, ctx: &RuleContext<'_>) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if c.cat.is_empty() {
        errs.add("cat", REQUIRED);
        return errs;
    }
    match ctx.regime.and_then(|r| r.category(c.cat.as_str())) {
        None => errs.add("cat", format!("'{}' not defined in regime", c.cat)),
        Some(cat) => {
            if let Some(key) = &c.key {
                if !cat.has_key(key.as_str()) {
                    errs.add("key", INVALID);
                }
            }
            if let Some(rate) = &c.rate {
                match cat.rate(rate.as_str()) {
                    None => errs.add("rate", INVALID),
                    Some(def) => {
                        if let Some(key) = &c.key {
                            if !def.keys.is_empty() && !key.is_in(&def.keys) {
                                errs.add("rate", format!("not valid with key '{key}'"));
                            }
                        }
                    }
                }
            }
        }
    }
    errs.nest("ext", extensions(&c.ext, ctx));
    errs.merge(hooks(ctx, NodeRef::Combo(c)));
    errs
}

fn validate_payment(pay: &PaymentDetails, ctx: &RuleContext<'_>) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if let Some(ins) = &pay.instructions {
        let mut e = FieldErrors::new();
        if ins.key.is_empty() {
            e.add("key", REQUIRED);
        }
        e.nest("ext", extensions(&ins.ext, ctx));
        e.merge(hooks(ctx, NodeRef::PayInstructions(ins)));
        errs.nest("instructions", e);
    }
    let mut aerrs = FieldErrors::new();
    for (i, adv) in pay.advances.iter().enumerate() {
        let mut e = FieldErrors::new();
        if adv.description.is_empty() {
            e.add("description", REQUIRED);
        }
        e.nest("ext", extensions(&adv.ext, ctx));
        e.merge(hooks(ctx, NodeRef::PayAdvance(adv)));
        aerrs.nest(i.to_string(), e);
    }
    errs.nest("advances", aerrs);
    errs
}
