use analysis_core::Fundamentals;

/// Debt-to-equity above this is flagged as overleveraged.
pub const MAX_DEBT_TO_EQUITY: f64 = 3.0;

/// Advisory warnings for a single company. A check only runs when its input exists.
pub fn red_flags(f: &Fundamentals) -> Vec<String> {
    let mut flags = Vec::new();

    if f.roa.filter(|v| v.is_finite()).is_some_and(|roa| roa <= 0.0) {
        flags.push("unprofitable".to_string());
    }
    if f.free_cash_flow.filter(|v| v.is_finite()).is_some_and(|fcf| fcf <= 0.0) {
        flags.push("cash_burner".to_string());
    }
    if f.debt_to_equity
        .filter(|v| v.is_finite())
        .is_some_and(|de| de > MAX_DEBT_TO_EQUITY)
    {
        flags.push("overleveraged".to_string());
    }

    flags
}
