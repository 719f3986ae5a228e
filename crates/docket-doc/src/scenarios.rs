//! # Scenario Engine
//!
//! Applies the scenario sets of an invoice's regime and addons, in that
//! order, to the invoice's document-level extensions and notes.
//!
//! Extension writes are first-writer-wins: a `SetIfAbsent` value only
//! lands when the key is still unset, whether the existing value came from
//! the input or from an earlier scenario. `SetAlways` replaces. Notes
//! accumulate in declaration order without duplicates. Tags are never
//! touched.

use docket_core::Extensions;

use crate::bill::{self, Invoice};
use crate::defs::{ExtMode, Scenario};
use crate::org::Note;
use crate::registry::RuleContext;
use crate::schema;

/// Apply every matching scenario to `inv`.
pub fn apply_scenarios(inv: &mut Invoice, ctx: &RuleContext<'_>) {
    for set in ctx.scenario_sets(schema::SHORT_INVOICE) {
        for scenario in &set.list {
            let matched = {
                let empty = Extensions::new();
                scenario.matches(&inv.kind, &inv.tags, inv.ext().unwrap_or(&empty))
            };
            if matched {
                apply(inv, scenario, ctx);
            }
        }
    }
}

fn apply(inv: &mut Invoice, scenario: &Scenario, ctx: &RuleContext<'_>) {
    if !scenario.ext.is_empty() {
        let ext = inv.ext_mut();
        for e in &scenario.ext {
            let write = match e.mode {
                ExtMode::SetIfAbsent => ext.get(e.key.as_str()).is_none(),
                ExtMode::SetAlways => true,
            };
            if write {
                ext.set(e.key.clone(), e.code.clone());
            }
        }
    }
    if let Some(note) = &scenario.note {
        let note = resolve_note(note, ctx);
        if !inv.notes.iter().any(|n| n.same_as(&note)) {
            inv.notes.push(note);
        }
    }
}

/// A note with no text but a `src` tag takes the tag's description.
fn resolve_note(note: &Note, ctx: &RuleContext<'_>) -> Note {
    let mut note = note.clone();
    if note.text.is_empty() {
        if let Some(src) = &note.src {
            let def = ctx
                .tag(schema::SHORT_INVOICE, src.as_str())
                .or_else(|| bill::default_tags().get(src.as_str()));
            if let Some(def) = def {
                note.text = def.desc.clone().unwrap_or_else(|| def.name.clone());
            }
        }
    }
    note
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{AddonDef, ExtensionDef, KeyDefinition, ScenarioExt, ScenarioSet, TagSet};
    use crate::registry::Registry;
    use docket_core::Key;
    use proptest::prelude::*;

    fn ext_def(key: &str) -> ExtensionDef {
        ExtensionDef {
            key: Key::from(key),
            name: key.into(),
            ..Default::default()
        }
    }

    fn addon(list: Vec<Scenario>) -> AddonDef {
        AddonDef {
            key: Key::from("test-v1"),
            name: "Test".into(),
            extensions: vec![ext_def("doc-type"), ext_def("concept")],
            tags: vec![TagSet {
                schema: schema::SHORT_INVOICE.into(),
                list: vec![KeyDefinition::new("export", "Export").with_desc("Exempt export of goods.")],
            }],
            scenarios: vec![ScenarioSet {
                schema: schema::SHORT_INVOICE.into(),
                list,
            }],
            ..Default::default()
        }
    }

    fn run(inv: &mut Invoice, list: Vec<Scenario>) {
        let mut reg = Registry::new();
        reg.register_addon(addon(list)).unwrap();
        let ctx = reg.context(None, &[Key::from("test-v1")]);
        apply_scenarios(inv, &ctx);
    }

    fn scenario(types: &[&str], tags: &[&str], ext: Vec<ScenarioExt>) -> Scenario {
        Scenario {
            types: types.iter().map(|t| Key::from(*t)).collect(),
            tags: tags.iter().map(|t| Key::from(*t)).collect(),
            ext,
            ..Default::default()
        }
    }

    #[test]
    fn type_and_tags_guard_scenarios() {
        let mut inv = Invoice::default();
        run(
            &mut inv,
            vec![
                scenario(&["standard"], &[], vec![ScenarioExt::new("doc-type", "001")]),
                scenario(&["credit-note"], &[], vec![ScenarioExt::new("concept", "X")]),
                scenario(&[], &["export"], vec![ScenarioExt::new("concept", "E")]),
            ],
        );
        let ext = inv.ext().unwrap();
        assert_eq!(ext.get("doc-type"), Some("001"));
        assert_eq!(ext.get("concept"), None);
    }

    #[test]
    fn existing_value_is_not_overwritten() {
        let mut inv = Invoice::default();
        inv.ext_mut().set("doc-type", "006");
        run(
            &mut inv,
            vec![scenario(&["standard"], &[], vec![ScenarioExt::new("doc-type", "001")])],
        );
        assert_eq!(inv.ext().unwrap().get("doc-type"), Some("006"));
    }

    #[test]
    fn set_always_replaces() {
        let mut inv = Invoice::default();
        inv.ext_mut().set("doc-type", "006");
        run(
            &mut inv,
            vec![scenario(&[], &[], vec![ScenarioExt::always("doc-type", "001")])],
        );
        assert_eq!(inv.ext().unwrap().get("doc-type"), Some("001"));
    }

    #[test]
    fn notes_take_tag_description_and_are_not_duplicated() {
        let mut inv = Invoice {
            tags: vec![Key::from("export")],
            ..Default::default()
        };
        let s = Scenario {
            tags: vec![Key::from("export")],
            note: Some(Note::legal("export", "")),
            ..Default::default()
        };
        run(&mut inv, vec![s.clone(), s]);
        assert_eq!(inv.notes.len(), 1);
        assert_eq!(inv.notes[0].text, "Exempt export of goods.");
        assert_eq!(inv.notes[0].src, Some(Key::from("export")));
    }

    #[test]
    fn ext_guard_matches_current_value() {
        let mut inv = Invoice::default();
        let mut s = scenario(&[], &[], vec![ScenarioExt::new("concept", "2")]);
        s.ext_key = Some(Key::from("doc-type"));
        s.ext_value = Some("011".into());
        run(
            &mut inv,
            vec![
                scenario(&[], &[], vec![ScenarioExt::new("doc-type", "011")]),
                s,
            ],
        );
        assert_eq!(inv.ext().unwrap().get("concept"), Some("2"));
    }

    proptest! {
        #[test]
        fn first_writer_wins(a in "[0-9]{3}", b in "[0-9]{3}", tagged in any::<bool>()) {
            let mut inv = Invoice::default();
            if tagged {
                inv.tags.push(Key::from("export"));
            }
            let tags_before = inv.tags.clone();
            run(
                &mut inv,
                vec![
                    scenario(&[], &[], vec![ScenarioExt::new("doc-type", &a)]),
                    scenario(&["standard"], &[], vec![ScenarioExt::new("doc-type", &b)]),
                ],
            );
            prop_assert_eq!(inv.ext().unwrap().get("doc-type"), Some(a.as_str()));
            prop_assert_eq!(inv.tags, tags_before);
        }
    }
}
