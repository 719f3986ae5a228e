//! # docket-regimes — Shipped Rule Sets
//!
//! Concrete regimes and addons, expressed as [`RegimeDef`]/[`AddonDef`]
//! values plus the [`RuleHooks`](docket_doc::RuleHooks) each one needs for
//! behaviour the data cannot describe.
//!
//! | regime | country | categories |
//! |--------|---------|------------|
//! | Spain | `ES` | VAT, IGIC, IPSI, IRPF (retained) |
//! | Italy | `IT` | VAT, IRPEF/IRES/INPS/ENASARCO/ENPAM (retained) |
//! | Argentina | `AR` | VAT |
//! | Greece | `EL` (`GR`) | VAT |
//!
//! | addon | standard |
//! |-------|----------|
//! | `es-facturae-v3` | Spanish FacturaE 3.2 |
//! | `it-sdi-v1` | Italian Sistema di Interscambio (FatturaPA) |
//! | `ar-arca-v4` | Argentine ARCA electronic invoicing |
//!
//! [`registry()`] assembles all of them. Call it once at start-up and
//! share the result.

pub mod addons;
pub mod regimes;

use docket_doc::{Registry, RegistryError};
use tracing::debug;

/// A registry holding every shipped regime and addon.
///
/// # Errors
///
/// Only if the definitions in this crate contradict themselves, which the
/// tests rule out.
pub fn registry() -> Result<Registry, RegistryError> {
    let mut reg = Registry::new();
    for def in regimes::all() {
        reg.register_regime(def)?;
    }
    for def in addons::all() {
        reg.register_addon(def)?;
    }
    debug!(
        regimes = reg.regimes().count(),
        addons = reg.addons().count(),
        "registry assembled"
    );
    Ok(reg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_definitions_register() {
        let reg = registry().unwrap();
        assert_eq!(reg.regimes().count(), 4);
        assert_eq!(reg.addons().count(), 3);
    }

    #[test]
    fn lookups_by_code_alias_and_key() {
        let reg = registry().unwrap();
        assert_eq!(reg.regime_for("es").unwrap().name, "Spain");
        assert_eq!(reg.regime_for("GR").unwrap().country.as_str(), "EL");
        assert!(reg.addon_for("it-sdi-v1").is_some());
        assert!(reg.addon_for("ar-arca-v4").is_some());
        assert!(reg.regime_for("FR").is_none());
    }

    #[test]
    fn definitions_serialize() {
        let reg = registry().unwrap();
        for r in reg.regimes() {
            let v = serde_json::to_value(r).unwrap();
            assert_eq!(v["country"], r.country.as_str());
            assert!(v["categories"].is_array());
        }
        for a in reg.addons() {
            let v = serde_json::to_value(a).unwrap();
            assert_eq!(v["key"], a.key.as_str());
        }
    }

    #[test]
    fn registering_twice_fails() {
        let mut reg = registry().unwrap();
        let err = reg.register_regime(regimes::es::regime()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRegime(_)));
        let err = reg.register_addon(addons::it_sdi::addon()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateAddon(_)));
    }
}
