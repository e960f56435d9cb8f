//! Property tests for sequential aggregation

use proptest::prelude::*;
use serde_json::{json, Value};
use trybatch::batch::BatchExecutor;
use trybatch::operation::Operation;
use trybatch::ErrorHandler;

fn run(batch: Vec<Vec<i64>>, failing: Vec<bool>) -> (Vec<Value>, Vec<Value>) {
    let expected: Vec<Value> = batch
        .iter()
        .zip(&failing)
        .filter(|(_, fails)| !**fails)
        .flat_map(|(values, _)| values.iter().map(|v| json!(v)))
        .collect();

    let operations: Vec<_> = batch
        .into_iter()
        .zip(failing)
        .map(|(values, fails)| {
            Operation::from_fn(move || {
                if fails {
                    Err(anyhow::anyhow!("planned failure"))
                } else {
                    Ok(values.iter().map(|v| json!(v)).collect::<Vec<Value>>())
                }
            })
        })
        .collect();

    let actual = tokio_test::block_on(
        BatchExecutor::new().execute(ErrorHandler::ignore(|_| {}), operations),
    )
    .into_result()
    .unwrap();

    (actual, expected)
}

proptest! {
    #[test]
    fn sequential_aggregate_is_concatenation(
        batch in prop::collection::vec(prop::collection::vec(any::<i64>(), 0..4), 1..8)
    ) {
        let failing = vec![false; batch.len()];
        let (actual, expected) = run(batch, failing);
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn handled_failures_drop_only_their_values(
        batch in prop::collection::vec(
            (prop::collection::vec(any::<i64>(), 0..4), any::<bool>()),
            1..8,
        )
    ) {
        let (values, failing): (Vec<_>, Vec<_>) = batch.into_iter().unzip();
        let (actual, expected) = run(values, failing);
        prop_assert_eq!(actual, expected);
    }
}
