use crate::coverage::CujCoverage;
use crate::evidence::{Priority, RiskRecord};
use crate::risk::factors::{self, dominant_factor, FACTOR_ORDER};

pub struct RationaleBuilder;

impl RationaleBuilder {
    pub fn percent(fraction: f64) -> String {
        format!("{:.0}%", fraction * 100.0)
    }

    pub fn urgency(priority: Priority) -> &'static str {
        match priority {
            Priority::Critical => "Schedule remediation immediately",
            Priority::High => "Address within the current iteration",
            Priority::Medium => "Plan for an upcoming iteration",
            Priority::Low => "Track in the backlog",
        }
    }

    pub fn risk_summary(risk: &RiskRecord) -> String {
        let component = &risk.component;
        match dominant_factor(&risk.factors) {
            Some(factors::SECURITY) => format!("Review security findings in {component}"),
            Some(factors::COVERAGE) => format!("Increase test coverage for {component}"),
            Some(factors::CHURN) => format!("Stabilize frequently changed {component}"),
            Some(factors::QUALITY) => format!("Resolve code quality issues in {component}"),
            _ => format!("Monitor {component}"),
        }
    }

    pub fn factor_breakdown(risk: &RiskRecord) -> String {
        FACTOR_ORDER
            .iter()
            .filter_map(|name| risk.factors.get(*name).map(|v| format!("{name} {v:.2}")))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn risk_actions(risk: &RiskRecord, priority: Priority) -> Vec<String> {
        let contributes = |name: &str| risk.factors.get(name).is_some_and(|v| *v > 0.0);
        let mut actions = Vec::new();
        if dominant_factor(&risk.factors) == Some(factors::SECURITY) {
            actions.push("Run a focused security review and fix the reported findings".to_string());
        }
        if contributes(factors::COVERAGE) {
            actions.push("Add tests for the uncovered paths".to_string());
        }
        if contributes(factors::CHURN) {
            actions.push("Stabilize the component and tighten review on changes".to_string());
        }
        actions.push(Self::urgency(priority).to_string());
        actions
    }

    pub fn risk_details(risk: &RiskRecord, priority: Priority) -> String {
        let mut lines = vec![
            format!(
                "Score {:.1} (band {}, priority {})",
                risk.score(),
                risk.band,
                priority
            ),
            format!("Factors: {}", Self::factor_breakdown(risk)),
            "Actions:".to_string(),
        ];
        lines.extend(
            Self::risk_actions(risk, priority)
                .into_iter()
                .map(|action| format!("- {action}")),
        );
        lines.join("\n")
    }

    pub fn gap_summary(journey: &CujCoverage) -> String {
        format!(
            "Raise coverage for journey '{}' from {} to {}",
            journey.journey.name,
            Self::percent(journey.coverage),
            Self::percent(journey.target)
        )
    }

    pub fn gap_details(journey: &CujCoverage) -> String {
        let mut lines = vec![format!(
            "Journey {} is at {} against a {} target (gap {:.1} points).",
            journey.journey.id,
            Self::percent(journey.coverage),
            Self::percent(journey.target),
            journey.gap() * 100.0
        )];
        let under = journey.under_covered();
        if journey.components.is_empty() {
            lines.push("No measured component matches the journey's patterns.".to_string());
        } else if !under.is_empty() {
            lines.push("Under-covered components:".to_string());
            lines.extend(
                under
                    .into_iter()
                    .map(|(component, value)| format!("- {component} ({})", Self::percent(value))),
            );
        }
        lines.join("\n")
    }
}
