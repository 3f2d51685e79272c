//! Property tests for repository semantics over generated fleets.

use partidb_core::{Filter, Patch, ReadRepository, RepositoryConfig, WriteRepository};
use partidb_testkit::{fleet_strategy, make_strategy, Automobile, PropTestConfig, TestRepository};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

async fn garage_with(fleet: &[Automobile], config: RepositoryConfig) -> TestRepository {
    let garage = TestRepository::with_config(config);
    garage
        .writer()
        .insert_many(fleet)
        .await
        .expect("Failed to seed fleet");
    garage
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn every_inserted_car_round_trips(fleet in fleet_strategy(10)) {
        runtime().block_on(async {
            let garage = garage_with(&fleet, RepositoryConfig::default()).await;
            let reader = garage.reader();
            for car in &fleet {
                let fetched = reader.get(&car.delimited_id()).await.unwrap();
                assert_eq!(&fetched, car);
            }
        });
    }

    #[test]
    fn delete_where_removes_exactly_the_matches(
        fleet in fleet_strategy(16),
        make in make_strategy(),
        page_size in 1usize..6,
        concurrency in 1usize..5,
    ) {
        let expected = fleet.iter().filter(|car| car.make == make).count() as u64;
        let config = RepositoryConfig::default()
            .page_size(page_size)
            .bulk_concurrency(concurrency);

        runtime().block_on(async {
            let garage = garage_with(&fleet, config).await;
            let filter = Filter::field("Make").eq(make.as_str());

            let outcome = garage.writer().delete_where(&filter).await.unwrap();
            assert_eq!(outcome.count(), expected);
            assert!(outcome.is_complete());

            let remaining = garage.reader().find(&Filter::all()).await.unwrap();
            assert_eq!(remaining.len() as u64, fleet.len() as u64 - expected);
            assert!(remaining.iter().all(|car| car.make != make));
            assert_eq!(garage.store.open_cursors(), 0);
        });
    }

    #[test]
    fn patch_where_touches_only_named_field_of_matches(
        fleet in fleet_strategy(12),
        make in make_strategy(),
        year in 1900..2030i32,
    ) {
        runtime().block_on(async {
            let garage = garage_with(&fleet, RepositoryConfig::default().page_size(3)).await;
            let filter = Filter::field("Make").eq(make.as_str());

            let outcome = garage
                .writer()
                .patch_where(&Patch::new().set("Year", year), &filter)
                .await
                .unwrap();
            let expected = fleet.iter().filter(|car| car.make == make).count() as u64;
            assert_eq!(outcome.count(), expected);

            let reader = garage.reader();
            for original in &fleet {
                let stored = reader.get(&original.delimited_id()).await.unwrap();
                let mut want = original.clone();
                if original.make == make {
                    want.year = year;
                }
                assert_eq!(stored, want);
            }
        });
    }
}
