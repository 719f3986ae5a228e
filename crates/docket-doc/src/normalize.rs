//! # Normalizer Dispatch
//!
//! Walks a document's substructures and, for each one, runs the type's own
//! clean-up followed by every applicable hook (regime first, then addons in
//! document order).
//!
//! The walk order is fixed: the invoice, its preceding references, the
//! parties (tax identity, addresses, telephones, registration, then the
//! party itself), lines (item, combos, then the line), charges (combos,
//! then the charge) and payment details.
//!
//! Every step is idempotent, so normalizing twice yields the same value.

use crate::bill::{Charge, Invoice, Line, PaymentDetails};
use crate::hooks::Node;
use crate::org::Party;
use crate::registry::RuleContext;
use crate::tax::Combo;

/// Offer one node to every hook in order.
fn dispatch(ctx: &RuleContext<'_>, mut node: Node<'_>) {
    for hooks in ctx.hooks() {
        hooks.normalize(node.reborrow());
    }
}

/// Normalize an invoice and everything in it.
pub fn normalize_invoice(inv: &mut Invoice, ctx: &RuleContext<'_>) {
    inv.normalize();
    dispatch(ctx, Node::Invoice(inv));

    for pre in &mut inv.preceding {
        pre.normalize();
        dispatch(ctx, Node::Preceding(pre));
    }
    if let Some(p) = &mut inv.supplier {
        normalize_party(p, ctx);
    }
    if let Some(p) = &mut inv.customer {
        normalize_party(p, ctx);
    }
    for line in &mut inv.lines {
        normalize_line(line, ctx);
    }
    for charge in &mut inv.charges {
        normalize_charge(charge, ctx);
    }
    if let Some(pay) = &mut inv.payment {
        normalize_payment(pay, ctx);
    }
}

/// Normalize a party and its contact details.
pub fn normalize_party(p: &mut Party, ctx: &RuleContext<'_>) {
    p.normalize();
    if let Some(tid) = &mut p.tax_id {
        tid.normalize();
        dispatch(ctx, Node::TaxIdentity(tid));
    }
    for id in &mut p.identities {
        id.ext.normalize();
    }
    for a in &mut p.addresses {
        a.normalize();
        dispatch(ctx, Node::Address(a));
    }
    for t in &mut p.telephones {
        t.normalize();
        dispatch(ctx, Node::Telephone(t));
    }
    if let Some(r) = &mut p.registration {
        r.normalize();
        dispatch(ctx, Node::Registration(r));
    }
    dispatch(ctx, Node::Party(p));
}

fn normalize_line(line: &mut Line, ctx: &RuleContext<'_>) {
    line.normalize();
    if let Some(item) = &mut line.item {
        item.normalize();
        dispatch(ctx, Node::Item(item));
    }
    normalize_combos(&mut line.taxes, ctx);
    dispatch(ctx, Node::Line(line));
}

fn normalize_charge(charge: &mut Charge, ctx: &RuleContext<'_>) {
    charge.normalize();
    normalize_combos(&mut charge.taxes, ctx);
    dispatch(ctx, Node::Charge(charge));
}

fn normalize_combos(combos: &mut [Combo], ctx: &RuleContext<'_>) {
    for c in combos {
        c.normalize();
        dispatch(ctx, Node::Combo(c));
    }
}

fn normalize_payment(pay: &mut PaymentDetails, ctx: &RuleContext<'_>) {
    if let Some(ins) = &mut pay.instructions {
        ins.normalize();
        dispatch(ctx, Node::PayInstructions(ins));
    }
    for adv in &mut pay.advances {
        adv.normalize();
        dispatch(ctx, Node::PayAdvance(adv));
    }
}
