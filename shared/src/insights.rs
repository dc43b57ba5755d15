//! Deterministic insight heuristic.
//!
//! Used when the model-backed insight call fails, so `generate_insights`
//! always returns a usable object. Pure on purpose.

use crate::models::{ExtractedBillData, InsightResponse, RiskLevel};

/// Insights are only worth generating when the bill has real figures.
pub fn should_generate_insights(data: &ExtractedBillData) -> bool {
    data.total_amount > 0.0 && data.units_consumed > 0.0
}

/// Compute insights from the extracted figures alone.
///
/// A power factor strictly between 0 and 0.9 is treated as poor (0 means
/// the bill did not state one). Savings estimate: 10% of the total for a
/// poor power factor, 5% otherwise, floored to a whole unit of currency.
pub fn heuristic_insights(data: &ExtractedBillData) -> InsightResponse {
    let cost_per_unit = if data.units_consumed > 0.0 {
        data.total_amount / data.units_consumed
    } else {
        0.0
    };
    let poor_power_factor = data.power_factor > 0.0 && data.power_factor < 0.9;

    let mut insights = vec![
        format!(
            "You consumed {:.0} units at an average cost of {:.2} per unit.",
            data.units_consumed, cost_per_unit
        ),
        format!("Your bill total for this period is {:.2}.", data.total_amount),
    ];
    let mut recommendations = vec![
        "Shift heavy appliance usage to off-peak hours where your tariff allows.".to_string(),
        "Compare this bill's consumption against previous months to spot trends.".to_string(),
    ];

    if poor_power_factor {
        insights.push(format!(
            "Your power factor of {:.2} is below 0.9, which can attract penalty charges.",
            data.power_factor
        ));
        recommendations.push(
            "Install power factor correction capacitors to bring the power factor above 0.9."
                .to_string(),
        );
    }

    let savings_rate = if poor_power_factor { 0.10 } else { 0.05 };

    InsightResponse {
        summary: format!(
            "Bill of {:.2} for {:.0} units{}.",
            data.total_amount,
            data.units_consumed,
            if poor_power_factor {
                " with a poor power factor"
            } else {
                ""
            }
        ),
        insights,
        recommendations,
        potential_savings: (data.total_amount * savings_rate).floor(),
        risk_level: if poor_power_factor {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bill(total: f64, units: f64, pf: f64) -> ExtractedBillData {
        ExtractedBillData {
            total_amount: total,
            units_consumed: units,
            power_factor: pf,
            ..Default::default()
        }
    }

    #[test]
    fn test_gating_truth_table() {
        assert!(!should_generate_insights(&bill(0.0, 500.0, 0.9)));
        assert!(!should_generate_insights(&bill(100.0, 0.0, 0.9)));
        assert!(should_generate_insights(&bill(100.0, 500.0, 0.9)));
    }

    #[test]
    fn test_poor_power_factor_raises_risk_and_savings() {
        let result = heuristic_insights(&bill(4500.0, 320.0, 0.82));
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.potential_savings, 450.0); // floor(4500 * 0.10)
        assert!(result.insights.iter().any(|i| i.contains("power factor")));
        assert!(result.recommendations.len() >= 2);
    }

    #[test]
    fn test_good_power_factor_is_low_risk() {
        let result = heuristic_insights(&bill(4500.0, 320.0, 0.95));
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.potential_savings, 225.0); // floor(4500 * 0.05)
    }

    #[test]
    fn test_unstated_power_factor_is_not_poor() {
        let result = heuristic_insights(&bill(1000.0, 200.0, 0.0));
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_zero_units_guards_division() {
        // Not reachable through the gate, but the function must not panic.
        let result = heuristic_insights(&bill(1000.0, 0.0, 0.5));
        assert!(result.insights[0].contains("0.00 per unit"));
    }

    #[test]
    fn test_savings_are_floored() {
        let result = heuristic_insights(&bill(1234.5, 100.0, 0.95));
        assert_eq!(result.potential_savings, 61.0); // floor(61.725)
    }
}
