use hierank::graph::effective_bounds;
use hierank::{
    rank, ranked_leaves, BlendMode, ConstraintSpec, DecisionGraph, FeedbackEntry, FeedbackTable,
    RankConfig, RankRequest, RewardWeights, SelectedCorpus, SoftConstraint, SoftConstraints,
    SolverConfig, Table, TransitionConfig, TransitionModelBuilder, UtilitySolver, Value,
};

fn grid_corpus() -> Table {
    Table::from_json_str(
        r#"[
            {"id": 0, "A": "x", "B": "p", "score": 4.0},
            {"id": 1, "A": "x", "B": "q", "score": 9.5},
            {"id": 2, "A": "y", "B": "p", "score": 2.5},
            {"id": 3, "A": "y", "B": "q", "score": 7.0}
        ]"#,
    )
    .unwrap()
}

fn ids(items: &[hierank::RankedItem]) -> Vec<i64> {
    items
        .iter()
        .map(|item| match item.row.get("id") {
            Some(Value::Integer(i)) => *i,
            _ => -1,
        })
        .collect()
}

#[test]
fn test_no_constraints_everything_is_zero() {
    let request = RankRequest::new(["A", "B"]);
    let ranking = rank(&grid_corpus(), None, None, &request, &RankConfig::default()).unwrap();

    assert_eq!(ranking.items.len(), 4);
    assert_eq!(ids(&ranking.items), vec![0, 1, 2, 3]);
    for item in &ranking.items {
        assert_eq!(item.utility_value, 0.0);
        assert_eq!(item.path_utility, 0.0);
    }
    assert_eq!(ranking.report.iterations, 1);
}

#[test]
fn test_categorical_preference_ranks_matches_first() {
    let request = RankRequest::new(["A", "B"])
        .soft(ConstraintSpec::categorical("B", "p"))
        .weights({
            let mut weights = RewardWeights::new();
            weights.set("B", (0.0, 1.0));
            weights
        });
    let ranking = rank(&grid_corpus(), None, None, &request, &RankConfig::default()).unwrap();

    assert_eq!(ids(&ranking.items), vec![0, 2, 1, 3]);
    for item in &ranking.items {
        let expected = if item.row["B"].as_string() == Some("p") { 1.0 } else { 0.0 };
        assert_eq!(item.utility_value, expected);
    }
}

#[test]
fn test_open_lower_bound_uses_column_minimum() {
    let corpus = grid_corpus();
    let (lo, hi) = effective_bounds(&corpus, "score", None, Some(5.0)).unwrap();
    assert_eq!(lo, 2.5);
    assert_eq!(hi, 5.0);

    let request = RankRequest::new(["A", "B"]).soft(ConstraintSpec::numerical("score", None, Some(5.0)));
    let ranking = rank(&corpus, None, None, &request, &RankConfig::default()).unwrap();
    let rewarded: Vec<i64> = ids(&ranking.items[..2]);
    assert_eq!(rewarded, vec![0, 2]);
    assert_eq!(ranking.items[2].utility_value, 0.0);
    assert!(ranking.items[1].path_utility > ranking.items[2].path_utility);
}

#[test]
fn test_request_document_from_yaml() {
    let request: RankRequest = serde_yaml::from_str(
        r#"
hierarchy: [A, B]
soft_constraints:
  - name: score
    type: numerical
    min: 7.0
  - name: B
    type: categorical
    value: p
hard_constraints:
  A: x
"#,
    )
    .unwrap();

    let weights = request.reward_weights();
    assert_eq!(weights.get("score").high, 2.0);
    assert_eq!(weights.get("B").high, 1.0);

    let ranking = rank(&grid_corpus(), None, None, &request, &RankConfig::default()).unwrap();
    // score 9.5 earns 2, B=p earns 1
    assert_eq!(ids(&ranking.items), vec![1, 0]);
    assert_eq!(ranking.items[0].utility_value, 2.0);
    assert_eq!(ranking.items[1].utility_value, 1.0);
}

#[test]
fn test_linked_records_share_parent_utility() {
    let corpus = grid_corpus();
    let hierarchy = vec!["A".to_string(), "B".to_string()];
    let model = TransitionModelBuilder::new(&corpus, &hierarchy)
        .link_records(true)
        .build()
        .unwrap();
    let mut constraints = SoftConstraints::new();
    constraints.insert("A", SoftConstraint::categorical("x"));
    let mut graph =
        DecisionGraph::new(&corpus, &hierarchy, model, &constraints, &RewardWeights::new()).unwrap();

    let solver = UtilitySolver::new(SolverConfig {
        theta: 1e-9,
        ..SolverConfig::default()
    });
    solver.solve(&mut graph).unwrap();

    let ranked = ranked_leaves(&graph);
    let top: Vec<Option<&str>> = ranked[..2]
        .iter()
        .map(|leaf| leaf.row().and_then(|row| row["A"].as_string()))
        .collect();
    assert_eq!(top, vec![Some("x"), Some("x")]);

    // every terminal value owns one x row and one y row
    let index = graph.index();
    let p = index.position(1, "p").unwrap();
    let q = index.position(1, "q").unwrap();
    let u = graph.utility_vector();
    assert!(u[p] > 0.0);
    assert!((u[p] - u[q]).abs() < 1e-9);
}

fn dataset_corpus() -> Table {
    Table::from_json_str(
        r#"[
            {"id": 0, "A": "x", "B": "p", "ds": "c"},
            {"id": 1, "A": "x", "B": "q", "ds": "c"},
            {"id": 2, "A": "x", "B": "p", "ds": "d"},
            {"id": 3, "A": "x", "B": "q", "ds": "d"}
        ]"#,
    )
    .unwrap()
}

#[test]
fn test_selected_items_and_feedback_reorder_ranking() {
    let corpus = dataset_corpus();
    let request = RankRequest::new(["A", "B"]).soft(ConstraintSpec::categorical("ds", "c"));
    let config = RankConfig {
        transition: TransitionConfig {
            blend_mode: BlendMode::Blended,
            link_records: true,
        },
        ..RankConfig::default()
    };

    // p and q are symmetric, so only the reward separates rows
    let baseline = rank(&corpus, None, None, &request, &config).unwrap();
    assert_eq!(ids(&baseline.items), vec![0, 1, 2, 3]);

    let selected = SelectedCorpus::new(
        Table::from_json_str(r#"[{"A": "x", "B": "q", "experiment_count": 50}]"#).unwrap(),
        "experiment_count",
    )
    .unwrap();
    let feedback = FeedbackTable::new(vec![
        FeedbackEntry { value: "q".into(), feedback: Some(1.0), count: 1.0 },
        FeedbackEntry { value: "p".into(), feedback: Some(0.0), count: 1.0 },
    ]);

    let biased = rank(&corpus, Some(&selected), Some(&feedback), &request, &config).unwrap();
    // every q row now outranks every p row, rewarded or not
    assert_eq!(ids(&biased.items), vec![1, 3, 0, 2]);
    assert_eq!(biased.items[1].utility_value, 0.0);
    assert_eq!(biased.items[2].utility_value, 1.0);
}
