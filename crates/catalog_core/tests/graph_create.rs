use catalog_core::{
    AlbumSpec, AssociationLoader, CatalogDb, EntityId, EntityKind, GraphCause, GraphCreator,
    GraphError, GraphStep, IdError, IdentifierGenerator, RandomIdGenerator, SingerPredicate,
    SingerSpec, StoreError, TrackCount, ValidationError,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::Cell;
use std::collections::HashSet;

#[test]
fn create_graph_then_load_by_last_name_returns_hydrated_singer() {
    let db = CatalogDb::open_in_memory().unwrap();
    let creator = GraphCreator::new(db.clone());

    let created = creator
        .create_graph(
            &SingerSpec::new("Ada", "Lovelace"),
            &[AlbumSpec::new("Calc", TrackCount::Exact(5))],
        )
        .unwrap();
    assert_eq!(created.albums.len(), 1);
    assert_eq!(created.albums[0].track_ids.len(), 5);

    let loader = AssociationLoader::new(db);
    let singers = loader
        .load_singers(&SingerPredicate::LastNameEquals("Lovelace".to_string()))
        .unwrap();

    assert_eq!(singers.len(), 1);
    let singer = &singers[0];
    assert_eq!(singer.meta.id, created.singer_id);
    assert_eq!(singer.first_name, "Ada");
    assert_eq!(singer.albums.len(), 1);

    let album = &singer.albums[0];
    assert_eq!(album.meta.id, created.albums[0].id);
    assert_eq!(album.singer_id, created.singer_id);
    assert_eq!(album.title, "Calc");
    assert_eq!(album.tracks.len(), 5);

    let numbers: Vec<u32> = album.tracks.iter().map(|track| track.track_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    for track in &album.tracks {
        assert_eq!(track.album_id, album.meta.id);
        assert!(track.duration_secs > 0);
    }
}

#[test]
fn store_assigns_equal_creation_and_update_timestamps() {
    let db = CatalogDb::open_in_memory().unwrap();
    let creator = GraphCreator::new(db.clone());
    let created = creator
        .create_graph(
            &SingerSpec::new("Grace", "Hopper"),
            &[AlbumSpec::new("Cobol", TrackCount::Exact(1))],
        )
        .unwrap();

    let singer = AssociationLoader::new(db)
        .load_singer(&created.singer_id)
        .unwrap()
        .unwrap();
    assert!(singer.meta.created_at > 0);
    assert_eq!(singer.meta.created_at, singer.meta.updated_at);
    let album = &singer.albums[0];
    assert_eq!(album.meta.created_at, album.meta.updated_at);
    assert_eq!(album.tracks[0].meta.created_at, album.tracks[0].meta.updated_at);
}

#[test]
fn timestamps_carry_millisecond_precision() {
    let db = CatalogDb::open_in_memory().unwrap();
    let creator = GraphCreator::new(db.clone());
    let loader = AssociationLoader::new(db);

    let mut stamps = Vec::new();
    for index in 0..20 {
        let created = creator
            .create_graph(&SingerSpec::new("Claude", format!("Shannon {index}")), &[])
            .unwrap();
        let singer = loader.load_singer(&created.singer_id).unwrap().unwrap();
        stamps.push(singer.meta.created_at);
        std::thread::sleep(std::time::Duration::from_millis(7));
    }

    assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(
        stamps.iter().any(|stamp| stamp % 1000 != 0),
        "timestamps truncated to whole seconds: {stamps:?}"
    );
    assert!(stamps[19] - stamps[0] >= 19 * 7);
}

#[test]
fn forced_failure_on_second_album_rolls_back_whole_graph() {
    let db = CatalogDb::open_in_memory().unwrap();
    db.with_session(|conn| {
        conn.execute_batch(
            "CREATE TRIGGER fail_second_album
             BEFORE INSERT ON albums
             WHEN (SELECT COUNT(*) FROM albums WHERE singer_id = NEW.singer_id) = 1
             BEGIN
                SELECT RAISE(ABORT, 'forced failure on second album');
             END;",
        )
        .map_err(StoreError::from)
    })
    .unwrap();

    let creator = GraphCreator::new(db.clone());
    let albums = [
        AlbumSpec::new("First", TrackCount::Exact(2)),
        AlbumSpec::new("Second", TrackCount::Exact(2)),
        AlbumSpec::new("Third", TrackCount::Exact(2)),
    ];
    let err = creator
        .create_graph(&SingerSpec::new("Alan", "Turing"), &albums)
        .unwrap_err();

    assert_eq!(err.step(), Some(GraphStep::InsertAlbum { index: 1 }));
    assert!(err.to_string().contains("insert album #2"));
    match &err {
        GraphError::Step {
            cause: GraphCause::Store(StoreError::Constraint { kind, message }),
            ..
        } => {
            assert_eq!(*kind, EntityKind::Album);
            assert!(message.contains("forced failure"));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(count_rows(&db, "singers"), 0);
    assert_eq!(count_rows(&db, "albums"), 0);
    assert_eq!(count_rows(&db, "tracks"), 0);
}

#[test]
fn duplicate_track_id_rolls_back_and_names_track_step() {
    let db = CatalogDb::open_in_memory().unwrap();
    let ids = ScriptedIds::new(&["singer-1", "album-1", "track-1", "track-1"]);
    let creator = GraphCreator::with_generator(db.clone(), &ids);

    let err = creator
        .create_graph(
            &SingerSpec::new("Edsger", "Dijkstra"),
            &[AlbumSpec::new("Shortest Paths", TrackCount::Exact(2))],
        )
        .unwrap_err();

    assert_eq!(
        err.step(),
        Some(GraphStep::InsertTrack {
            album_index: 0,
            track_number: 2
        })
    );
    assert_eq!(count_rows(&db, "singers"), 0);
    assert_eq!(count_rows(&db, "tracks"), 0);
}

#[test]
fn identifier_failure_propagates_and_rolls_back() {
    let db = CatalogDb::open_in_memory().unwrap();
    let ids = ScriptedIds::new(&["singer-1", "album-1"]);
    let creator = GraphCreator::with_generator(db.clone(), &ids);

    let err = creator
        .create_graph(
            &SingerSpec::new("Barbara", "Liskov"),
            &[AlbumSpec::new("Substitution", TrackCount::Exact(3))],
        )
        .unwrap_err();

    assert_eq!(
        err.step(),
        Some(GraphStep::TrackId {
            album_index: 0,
            track_number: 1
        })
    );
    match &err {
        GraphError::Step {
            cause: GraphCause::Id(IdError::Entropy(source)),
            ..
        } => assert!(source.to_string().contains("scripted ids exhausted")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(count_rows(&db, "singers"), 0);
    assert_eq!(count_rows(&db, "albums"), 0);
}

#[test]
fn invalid_album_is_rejected_before_any_write() {
    let db = CatalogDb::open_in_memory().unwrap();
    let creator = GraphCreator::new(db.clone());

    let err = creator
        .create_graph(
            &SingerSpec::new("Donald", "Knuth"),
            &[
                AlbumSpec::new("Volume 1", TrackCount::Exact(1)),
                AlbumSpec::new("   ", TrackCount::Exact(1)),
            ],
        )
        .unwrap_err();

    match err {
        GraphError::Validation {
            entity,
            position,
            error,
        } => {
            assert_eq!(entity, EntityKind::Album);
            assert_eq!(position, Some(1));
            assert_eq!(error, ValidationError::Blank("title"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(count_rows(&db, "singers"), 0);
}

#[test]
fn ranged_track_count_is_drawn_inside_caller_range() {
    let db = CatalogDb::open_in_memory().unwrap();
    let creator = GraphCreator::new(db);
    let mut rng = StdRng::seed_from_u64(2024);

    for _ in 0..25 {
        let created = creator
            .create_graph_with_rng(
                &SingerSpec::new("Frances", "Allen"),
                &[AlbumSpec::new("Optimizations", TrackCount::Between { min: 1, max: 22 })],
                &mut rng,
            )
            .unwrap();
        let tracks = created.albums[0].track_ids.len();
        assert!((1..=22).contains(&tracks), "track count {tracks} out of range");
    }
}

#[test]
fn singer_without_albums_is_a_valid_graph() {
    let db = CatalogDb::open_in_memory().unwrap();
    let created = GraphCreator::new(db.clone())
        .create_graph(&SingerSpec::new("Ken", "Thompson"), &[])
        .unwrap();

    assert!(created.albums.is_empty());
    assert_eq!(count_rows(&db, "singers"), 1);
    assert_eq!(count_rows(&db, "albums"), 0);
}

#[test]
fn ten_thousand_generated_ids_are_distinct() {
    let generator = RandomIdGenerator;
    let mut seen = HashSet::new();
    for _ in 0..10_000 {
        assert!(seen.insert(generator.generate().unwrap()));
    }
}

#[test]
fn ids_returned_by_repeated_graph_creation_are_distinct() {
    let db = CatalogDb::open_in_memory().unwrap();
    let creator = GraphCreator::new(db);
    let mut seen: HashSet<EntityId> = HashSet::new();

    for index in 0..200 {
        let created = creator
            .create_graph(
                &SingerSpec::new("Hedy", format!("Lamarr {index}")),
                &[
                    AlbumSpec::new("Frequency", TrackCount::Exact(2)),
                    AlbumSpec::new("Hopping", TrackCount::Exact(1)),
                ],
            )
            .unwrap();
        assert!(seen.insert(created.singer_id.clone()));
        for album in created.albums {
            assert!(seen.insert(album.id));
            for track_id in album.track_ids {
                assert!(seen.insert(track_id));
            }
        }
    }
    assert_eq!(seen.len(), 200 * 6);
}

#[test]
fn concurrent_graph_creation_commits_every_graph() {
    let db = CatalogDb::open_in_memory().unwrap();

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let creator = GraphCreator::new(db.clone());
            scope.spawn(move || {
                for index in 0..10 {
                    creator
                        .create_graph(
                            &SingerSpec::new("Worker", format!("W{worker}-{index}")),
                            &[AlbumSpec::new("Parallel", TrackCount::Exact(3))],
                        )
                        .unwrap();
                }
            });
        }
    });

    assert_eq!(count_rows(&db, "singers"), 80);
    assert_eq!(count_rows(&db, "albums"), 80);
    assert_eq!(count_rows(&db, "tracks"), 240);
}

/// Hands out a fixed id sequence, then fails like a dried-up entropy source.
struct ScriptedIds {
    ids: Vec<&'static str>,
    next: Cell<usize>,
}

impl ScriptedIds {
    fn new(ids: &[&'static str]) -> Self {
        Self {
            ids: ids.to_vec(),
            next: Cell::new(0),
        }
    }
}

impl IdentifierGenerator for ScriptedIds {
    fn generate(&self) -> Result<EntityId, IdError> {
        let index = self.next.get();
        let id = self
            .ids
            .get(index)
            .ok_or_else(|| IdError::Entropy(rand::Error::new("scripted ids exhausted")))?;
        self.next.set(index + 1);
        Ok(EntityId::from_existing(*id))
    }
}

fn count_rows(db: &CatalogDb, table: &str) -> i64 {
    db.with_session(|conn| {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
            .map_err(StoreError::from)
    })
    .unwrap()
}
