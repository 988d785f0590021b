//! Dynamic alias binding (§4.E "Alias resolution on callback").
//!
//! Near-month / next-month pseudo-symbols (GLOSSARY) denote a *role*
//! within a product family rather than a specific contract. The
//! upstream delivers callbacks keyed by an opaque exchange code; this
//! module extracts the product-family prefix from both sides so a
//! callback can be bound to the alias that's currently subscribed for
//! that family.

/// Extract the product-family prefix from a client-facing alias.
///
/// Aliases are a product code followed by a role suffix (`R1` for
/// near-month, `R2` for next-month), e.g. `TMFR1` -> `TMF`, `MXFR2` ->
/// `MXF`. Aliases that don't match the pseudo-symbol shape return the
/// alias unchanged, so a literal exchange-code alias still resolves to
/// itself.
pub fn alias_family_prefix(alias: &str) -> &str {
    if let Some(idx) = alias.rfind('R') {
        let (prefix, suffix) = alias.split_at(idx);
        if suffix[1..].chars().all(|c| c.is_ascii_digit()) && !suffix[1..].is_empty() {
            return prefix;
        }
    }
    alias
}

/// Extract the product-family prefix from an upstream exchange code.
///
/// Exchange codes are a product code followed by a contract-month
/// letter and a two-digit year, e.g. `TMFB6` -> `TMF`. We take the
/// leading alphabetic run.
pub fn exchange_code_family_prefix(exchange_code: &str) -> &str {
    let end = exchange_code
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(exchange_code.len());
    let prefix_end = exchange_code[..end]
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_ascii_digit())
        .map(|(i, _)| i + 1)
        .unwrap_or(0);
    // Exchange codes are typically PRODUCT + single month letter + YY;
    // strip the trailing month letter to get the bare product prefix.
    let alpha_run = &exchange_code[..end];
    if alpha_run.len() > prefix_end && alpha_run.len() > 1 {
        &alpha_run[..alpha_run.len() - 1]
    } else {
        alpha_run
    }
}

/// Is this alias a near/next-month pseudo-symbol (i.e. does it carry a
/// role suffix rather than naming a specific contract)?
pub fn is_pseudo_symbol(alias: &str) -> bool {
    alias_family_prefix(alias) != alias
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_prefix_strips_role_suffix() {
        assert_eq!(alias_family_prefix("TMFR1"), "TMF");
        assert_eq!(alias_family_prefix("MXFR2"), "MXF");
    }

    #[test]
    fn non_pseudo_alias_is_unchanged() {
        assert_eq!(alias_family_prefix("TMFB6"), "TMFB6");
        assert!(!is_pseudo_symbol("TMFB6"));
    }

    #[test]
    fn exchange_code_prefix_strips_month_letter() {
        assert_eq!(exchange_code_family_prefix("TMFB6"), "TMF");
        assert_eq!(exchange_code_family_prefix("MXFC6"), "MXF");
    }

    #[test]
    fn pseudo_symbol_detection() {
        assert!(is_pseudo_symbol("TMFR1"));
        assert!(is_pseudo_symbol("MXFR2"));
    }
}
