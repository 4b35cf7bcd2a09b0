use catalog_core::{
    AssociationLoader, CatalogDb, GraphCreator, GraphStep, RandomDataSeeder, SingerPredicate,
    StoreError, TrackCount, ValidationError,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn synthesized_track_count_stays_within_default_range() {
    let db = CatalogDb::open_in_memory().unwrap();
    let creator = GraphCreator::new(db);
    let seeder = RandomDataSeeder::new(&creator);
    let mut rng = StdRng::seed_from_u64(99);

    let mut seen_min = u32::MAX;
    let mut seen_max = 0;
    for _ in 0..1_000 {
        let (singer, album) = seeder.synthesize(&mut rng);
        assert!(singer.validate().is_ok());
        assert!(album.validate().is_ok());
        match album.tracks {
            TrackCount::Exact(count) => {
                assert!((1..=22).contains(&count), "track count {count} out of range");
                seen_min = seen_min.min(count);
                seen_max = seen_max.max(count);
            }
            other => panic!("seeder must pre-draw an exact count, got {other:?}"),
        }
    }
    assert_eq!(seen_min, 1);
    assert_eq!(seen_max, 22);
}

#[test]
fn seed_creates_one_hydratable_graph_per_iteration() {
    let db = CatalogDb::open_in_memory().unwrap();
    let creator = GraphCreator::new(db.clone());
    let report = RandomDataSeeder::new(&creator)
        .seed_with_rng(12, &mut StdRng::seed_from_u64(5));

    assert!(report.is_complete());
    assert_eq!(report.created.len(), 12);

    let loader = AssociationLoader::new(db);
    for created in &report.created {
        let singer = loader.load_singer(&created.singer_id).unwrap().unwrap();
        assert_eq!(singer.albums.len(), 1);
        let tracks = singer.albums[0].tracks.len();
        assert_eq!(tracks, created.albums[0].track_ids.len());
        assert!((1..=22).contains(&tracks));
    }
}

#[test]
fn seed_one_uses_thread_rng() {
    let db = CatalogDb::open_in_memory().unwrap();
    let creator = GraphCreator::new(db.clone());
    let report = RandomDataSeeder::new(&creator).seed(1);

    assert_eq!(report.created.len(), 1);
    let last_name = AssociationLoader::new(db)
        .load_singer(&report.created[0].singer_id)
        .unwrap()
        .unwrap()
        .last_name;
    assert!(!last_name.is_empty());
}

#[test]
fn failed_iteration_does_not_undo_earlier_ones() {
    let db = CatalogDb::open_in_memory().unwrap();
    // Third singer insert fails; every other iteration must still commit.
    db.with_session(|conn| {
        conn.execute_batch(
            "CREATE TRIGGER fail_third_singer
             BEFORE INSERT ON singers
             WHEN (SELECT COUNT(*) FROM singers) = 2
             BEGIN
                SELECT RAISE(ABORT, 'forced failure on third singer');
             END;",
        )
        .map_err(StoreError::from)
    })
    .unwrap();

    let creator = GraphCreator::new(db.clone());
    let report = RandomDataSeeder::new(&creator)
        .with_track_range(2..=2)
        .unwrap()
        .seed_with_rng(3, &mut StdRng::seed_from_u64(11));

    assert_eq!(report.created.len(), 2);
    assert_eq!(report.failures.len(), 1);
    let (iteration, err) = &report.failures[0];
    assert_eq!(*iteration, 2);
    assert_eq!(err.step(), Some(GraphStep::InsertSinger));

    let committed: usize = report
        .created
        .iter()
        .map(|created| {
            AssociationLoader::new(db.clone())
                .load_singers(&SingerPredicate::IdEquals(created.singer_id.clone()))
                .unwrap()
                .len()
        })
        .sum();
    assert_eq!(committed, 2);
    let tracks: i64 = db
        .with_session(|conn| {
            conn.query_row("SELECT COUNT(*) FROM tracks;", [], |row| row.get(0))
                .map_err(StoreError::from)
        })
        .unwrap();
    assert_eq!(tracks, 4);
}

#[test]
fn empty_track_range_is_rejected() {
    let db = CatalogDb::open_in_memory().unwrap();
    let creator = GraphCreator::new(db);

    let err = RandomDataSeeder::new(&creator)
        .with_track_range(9..=3)
        .err()
        .unwrap();
    assert_eq!(err, ValidationError::EmptyTrackRange { min: 9, max: 3 });
}
