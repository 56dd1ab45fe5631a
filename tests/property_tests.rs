use capclust::cluster::{ParamMap, ParamValue, SpatialClusterer, NOISE};
use capclust::event::{EventPointCloud, EventSet};
use capclust::score::ScoreEvaluator;
use proptest::prelude::*;

fn event_strategy() -> impl Strategy<Value = EventPointCloud> {
    prop::collection::vec(
        (
            prop::array::uniform3(-500.0f64..500.0),
            0.01f64..8.0,
            0i64..4,
        ),
        1..24,
    )
    .prop_map(|deposits| {
        let points: Vec<[f64; 3]> = deposits.iter().map(|d| d.0).collect();
        let energies: Vec<f64> = deposits.iter().map(|d| d.1).collect();
        let neutron_ids: Vec<i64> = deposits.iter().map(|d| d.2).collect();
        let gamma_ids: Vec<i64> = deposits.iter().map(|d| d.2 * 10 + 1).collect();
        EventPointCloud::new(points, energies, neutron_ids, gamma_ids).unwrap()
    })
}

fn dbscan_params(eps: f64, min_samples: i64) -> ParamMap {
    let mut params = ParamMap::new();
    params.insert("eps".into(), ParamValue::Float(eps));
    params.insert("min_samples".into(), ParamValue::Int(min_samples));
    params
}

proptest! {
    #[test]
    fn prop_assignment_lengths_match_events(
        events in prop::collection::vec(event_strategy(), 1..6),
        eps in 1.0f64..300.0,
        min_samples in 1i64..5,
    ) {
        let events = EventSet::new(events);
        let run = SpatialClusterer::new()
            .cluster(&events, "dbscan", &dbscan_params(eps, min_samples))
            .unwrap();

        prop_assert_eq!(run.assignments.len(), events.len());
        for (assignment, event) in run.assignments.iter().zip(events.events()) {
            prop_assert_eq!(assignment.len(), event.len());
            for &label in assignment {
                prop_assert!(label >= NOISE);
            }
        }
    }

    #[test]
    fn prop_seeded_clustering_is_idempotent(
        events in prop::collection::vec(event_strategy(), 1..4),
        n_components in 1i64..3,
    ) {
        let events = EventSet::new(events);
        let smallest = events.events().iter().map(EventPointCloud::len).min().unwrap();
        prop_assume!(n_components as usize <= smallest);

        let mut params = ParamMap::new();
        params.insert("n_components".into(), ParamValue::Int(n_components));

        let clusterer = SpatialClusterer::new().with_seed(42);
        let first = clusterer.cluster(&events, "gaussian", &params).unwrap();
        let second = clusterer.cluster(&events, "gaussian", &params).unwrap();
        prop_assert_eq!(first.assignments, second.assignments);
    }

    #[test]
    fn prop_average_metrics_within_bounds(
        events in prop::collection::vec(event_strategy(), 1..5),
        eps in 1.0f64..400.0,
    ) {
        let events = EventSet::new(events);
        let run = SpatialClusterer::new()
            .cluster(&events, "dbscan", &dbscan_params(eps, 2))
            .unwrap();
        let (_, avg) = ScoreEvaluator::new().score(&run, &events, "neutron").unwrap();

        let eps_tol = 1e-9;
        for value in [avg.homogeneity, avg.completeness, avg.v_measure] {
            prop_assert!((-eps_tol..=1.0 + eps_tol).contains(&value), "value = {value}");
        }
        for value in [avg.adjusted_rand_index, avg.adjusted_mutual_info] {
            prop_assert!((-1.0 - eps_tol..=1.0 + eps_tol).contains(&value), "value = {value}");
        }
        if let Some(sil) = avg.silhouette {
            prop_assert!((-1.0 - eps_tol..=1.0 + eps_tol).contains(&sil), "sil = {sil}");
        }
    }
}
