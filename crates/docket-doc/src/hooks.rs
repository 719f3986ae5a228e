//! # Rule Hooks
//!
//! Regimes and addons may attach behaviour that their data cannot express.
//! The dispatcher walks a fixed tree of substructures and offers each one
//! to every applicable hook, regime first, then addons in the order the
//! document declares them.
//!
//! A hook sees the visited value as a [`Node`] (mutable, for
//! normalization) or a [`NodeRef`] (shared, for validation) and matches on
//! the kinds it cares about. Kinds it ignores fall through to the default
//! arm. Normalizers must be idempotent.

use docket_core::FieldErrors;

use crate::bill::{Charge, Invoice, Line};
use crate::org::{Address, DocumentRef, Item, Party, Registration, Telephone};
use crate::pay;
use crate::tax::{Combo, TaxIdentity};

/// Behaviour attached to a regime or addon.
pub trait RuleHooks: Send + Sync + std::fmt::Debug {
    /// Adjust a value in place.
    fn normalize(&self, _node: Node<'_>) {}

    /// Report problems with a value, keyed by field name relative to it.
    fn validate(&self, _node: NodeRef<'_>) -> FieldErrors {
        FieldErrors::new()
    }
}

/// A visited value, borrowed mutably.
#[derive(Debug)]
pub enum Node<'a> {
    /// The invoice itself.
    Invoice(&'a mut Invoice),
    /// A party's tax identity.
    TaxIdentity(&'a mut TaxIdentity),
    /// Supplier or customer.
    Party(&'a mut Party),
    /// A party address.
    Address(&'a mut Address),
    /// A party telephone.
    Telephone(&'a mut Telephone),
    /// A tax combo on a line or charge.
    Combo(&'a mut Combo),
    /// Payment instructions.
    PayInstructions(&'a mut pay::Instructions),
    /// A payment advance.
    PayAdvance(&'a mut pay::Advance),
    /// An invoice line.
    Line(&'a mut Line),
    /// A document-level charge.
    Charge(&'a mut Charge),
    /// A preceding-document reference.
    Preceding(&'a mut DocumentRef),
    /// A line item.
    Item(&'a mut Item),
    /// A party's registry details.
    Registration(&'a mut Registration),
}

impl Node<'_> {
    /// Borrow the same value again for a shorter lifetime, so one node can
    /// be offered to several hooks in turn.
    pub fn reborrow(&mut self) -> Node<'_> {
        match self {
            Node::Invoice(v) => Node::Invoice(&mut **v),
            Node::TaxIdentity(v) => Node::TaxIdentity(&mut **v),
            Node::Party(v) => Node::Party(&mut **v),
            Node::Address(v) => Node::Address(&mut **v),
            Node::Telephone(v) => Node::Telephone(&mut **v),
            Node::Combo(v) => Node::Combo(&mut **v),
            Node::PayInstructions(v) => Node::PayInstructions(&mut **v),
            Node::PayAdvance(v) => Node::PayAdvance(&mut **v),
            Node::Line(v) => Node::Line(&mut **v),
            Node::Charge(v) => Node::Charge(&mut **v),
            Node::Preceding(v) => Node::Preceding(&mut **v),
            Node::Item(v) => Node::Item(&mut **v),
            Node::Registration(v) => Node::Registration(&mut **v),
        }
    }
}

/// A visited value, borrowed immutably.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    /// The invoice itself.
    Invoice(&'a Invoice),
    /// A party's tax identity.
    TaxIdentity(&'a TaxIdentity),
    /// Supplier or customer.
    Party(&'a Party),
    /// A party address.
    Address(&'a Address),
    /// A party telephone.
    Telephone(&'a Telephone),
    /// A tax combo on a line or charge.
    Combo(&'a Combo),
    /// Payment instructions.
    PayInstructions(&'a pay::Instructions),
    /// A payment advance.
    PayAdvance(&'a pay::Advance),
    /// An invoice line.
    Line(&'a Line),
    /// A document-level charge.
    Charge(&'a Charge),
    /// A preceding-document reference.
    Preceding(&'a DocumentRef),
    /// A line item.
    Item(&'a Item),
    /// A party's registry details.
    Registration(&'a Registration),
}
