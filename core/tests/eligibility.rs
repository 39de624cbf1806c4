//! Eligibility engine tests: which surveys a plan unlocks.

use survey_core::{
    config::{CatalogConfig, PlanTier},
    eligibility::{
        active_plan, available_surveys, available_surveys_with, can_start, is_eligible,
        remaining_quota, withdrawal_ready, HistoryPolicy, PlanRank,
    },
    progress::UserProgress,
};

// ── Test helpers ────────────────────────────────────────────────────────────

fn progress_on(catalog: &CatalogConfig, plan: &str) -> UserProgress {
    let mut p = UserProgress::seeded(&catalog.default_progress);
    p.current_plan = plan.into();
    p
}

fn ids(progress: &UserProgress, catalog: &CatalogConfig) -> Vec<String> {
    available_surveys(progress, catalog)
        .into_iter()
        .map(|s| s.id.clone())
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Scenario B: with no plan selected nothing is listed.
#[test]
fn no_plan_lists_nothing() {
    let catalog = CatalogConfig::default_test();
    let progress = progress_on(&catalog, "none");

    assert!(active_plan(&progress, &catalog).is_none());
    assert!(available_surveys(&progress, &catalog).is_empty());
    assert!(!can_start(&progress, &catalog));
    assert_eq!(remaining_quota(&progress, &catalog), 0);
}

/// Active plan lookup is an exact name match.
#[test]
fn active_plan_requires_exact_name() {
    let catalog = CatalogConfig::default_test();

    let gold = progress_on(&catalog, "Gold");
    assert_eq!(active_plan(&gold, &catalog).map(|p| p.daily_survey), Some(5));

    let lower = progress_on(&catalog, "gold");
    assert!(active_plan(&lower, &catalog).is_none());
}

/// Each tier unlocks its own surveys plus everything below, in catalog order.
#[test]
fn tiers_unlock_surveys_at_or_below_rank() {
    let catalog = CatalogConfig::default_test();

    assert_eq!(ids(&progress_on(&catalog, "Starter"), &catalog), ["s1", "s2"]);
    assert_eq!(ids(&progress_on(&catalog, "Silver"), &catalog), ["s1", "s2", "s3"]);
    assert_eq!(ids(&progress_on(&catalog, "Gold"), &catalog), ["s1", "s2", "s3", "s4"]);
    assert_eq!(
        ids(&progress_on(&catalog, "Platinum"), &catalog),
        ["s1", "s2", "s3", "s4", "s5"]
    );
}

/// P3: a higher plan's list is a superset of every lower plan's list.
#[test]
fn higher_plan_sees_superset_of_lower_plan() {
    let catalog = CatalogConfig::default_test();
    let ranked = ["Starter", "Silver", "Gold", "Platinum"];

    for (i, lower) in ranked.iter().enumerate() {
        for higher in &ranked[i..] {
            let low = ids(&progress_on(&catalog, lower), &catalog);
            let high = ids(&progress_on(&catalog, higher), &catalog);
            for id in &low {
                assert!(
                    high.contains(id),
                    "{higher} should see {id} because {lower} does"
                );
            }
        }
    }
}

/// A catalog plan outside the four ranks is active but ranks below Starter:
/// it only sees surveys whose required plan is also unranked.
#[test]
fn unranked_active_plan_sees_only_unranked_surveys() {
    let mut catalog = CatalogConfig::default_test();
    catalog.plans.push(PlanTier {
        plan_name:          "Trial".into(),
        daily_survey:       2,
        earning_per_survey: 10.0,
        daily_income:       20.0,
        monthly_income:     600.0,
        minimum_withdrawal: 100.0,
        price:              0.0,
    });
    let mut promo = catalog.surveys[0].clone();
    promo.id = "promo".into();
    promo.required_plan = "Trial".into();
    catalog.surveys.push(promo);

    let trial = progress_on(&catalog, "Trial");
    assert_eq!(PlanRank::of("Trial"), PlanRank::Unranked);
    assert_eq!(ids(&trial, &catalog), ["promo"]);

    // Starter outranks the unranked requirement.
    assert!(ids(&progress_on(&catalog, "Starter"), &catalog).contains(&"promo".to_string()));
}

/// The list ignores the quota counter and completion history by default.
#[test]
fn list_is_quota_blind_and_history_blind() {
    let catalog = CatalogConfig::default_test();
    let mut progress = progress_on(&catalog, "Starter");
    progress.surveys_completed_today = 1;
    progress.completed_surveys = vec!["s1".into(), "s1".into()];

    assert_eq!(ids(&progress, &catalog), ["s1", "s2"]);
    assert!(!can_start(&progress, &catalog));
}

/// ExcludeCompleted drops surveys already in the history.
#[test]
fn exclude_completed_policy_hides_history() {
    let catalog = CatalogConfig::default_test();
    let mut progress = progress_on(&catalog, "Silver");
    progress.completed_surveys = vec!["s1".into()];

    let listed: Vec<_> = available_surveys_with(&progress, &catalog, HistoryPolicy::ExcludeCompleted)
        .into_iter()
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(listed, ["s2", "s3"]);
}

#[test]
fn remaining_quota_saturates_at_zero() {
    let catalog = CatalogConfig::default_test();
    let mut progress = progress_on(&catalog, "Silver");
    assert_eq!(remaining_quota(&progress, &catalog), 3);

    progress.surveys_completed_today = 2;
    assert_eq!(remaining_quota(&progress, &catalog), 1);
    assert!(can_start(&progress, &catalog));

    // A counter above quota (e.g. after a downgrade) is never negative.
    progress.current_plan = "Starter".into();
    assert_eq!(remaining_quota(&progress, &catalog), 0);
}

#[test]
fn eligibility_of_single_survey_follows_rank() {
    let catalog = CatalogConfig::default_test();
    let silver = progress_on(&catalog, "Silver");
    let s3 = catalog.survey("s3").unwrap();
    let s4 = catalog.survey("s4").unwrap();

    assert!(is_eligible(&silver, &catalog, s3));
    assert!(!is_eligible(&silver, &catalog, s4));
    assert!(!is_eligible(&progress_on(&catalog, "none"), &catalog, s3));
}

#[test]
fn withdrawal_ready_compares_pending_to_plan_minimum() {
    let catalog = CatalogConfig::default_test();
    let mut progress = progress_on(&catalog, "Platinum");
    progress.total_earnings = 600.0;
    progress.pending_earnings = 499.0;
    assert!(!withdrawal_ready(&progress, &catalog));

    progress.pending_earnings = 500.0;
    assert!(withdrawal_ready(&progress, &catalog));
}
