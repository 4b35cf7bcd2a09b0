//! Synthetic catalog data for bootstrap and demos.
//!
//! # Responsibility
//! - Synthesize random singer/album specs.
//! - Create each synthesized graph through `GraphCreator`.
//!
//! # Invariants
//! - Every iteration is its own atomic unit; a failure never undoes earlier ones.
//! - Synthesized track counts are drawn uniformly from the configured inclusive range.

use crate::id::IdentifierGenerator;
use crate::model::catalog::{AlbumSpec, SingerSpec, TrackCount, ValidationError};
use crate::service::graph_creator::{resolve_track_count, CreatedGraph, GraphCreator, GraphError};
use chrono::NaiveDate;
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::RangeInclusive;

pub const DEFAULT_TRACK_RANGE: RangeInclusive<u32> = 1..=22;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Grace", "Edsger", "Barbara", "Donald", "Frances", "John", "Margaret", "Ken",
    "Radia", "Dennis", "Hedy", "Niklaus", "Karen", "Tony",
];

const LAST_NAMES: &[&str] = &[
    "Lovelace", "Turing", "Hopper", "Dijkstra", "Liskov", "Knuth", "Allen", "Backus",
    "Hamilton", "Thompson", "Perlman", "Ritchie", "Lamarr", "Wirth", "Jones", "Hoare",
];

const TITLE_ADJECTIVES: &[&str] = &[
    "Silent", "Electric", "Recursive", "Golden", "Broken", "Midnight", "Parallel", "Crimson",
    "Hidden", "Endless",
];

const TITLE_NOUNS: &[&str] = &[
    "Engine", "Garden", "Signal", "Harbor", "Machine", "Echo", "Orbit", "Letters", "Tides",
    "Lanterns",
];

/// Outcome of one seeding batch.
#[derive(Debug, Default)]
pub struct SeedReport {
    pub created: Vec<CreatedGraph>,
    /// 0-based iteration index and its failure.
    pub failures: Vec<(usize, GraphError)>,
}

impl SeedReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives `GraphCreator` with randomized singer/album graphs.
pub struct RandomDataSeeder<'a, G> {
    creator: &'a GraphCreator<G>,
    track_range: RangeInclusive<u32>,
}

impl<'a, G: IdentifierGenerator> RandomDataSeeder<'a, G> {
    pub fn new(creator: &'a GraphCreator<G>) -> Self {
        Self {
            creator,
            track_range: DEFAULT_TRACK_RANGE,
        }
    }

    /// Overrides the inclusive per-album track count range.
    pub fn with_track_range(
        mut self,
        track_range: RangeInclusive<u32>,
    ) -> Result<Self, ValidationError> {
        TrackCount::Between {
            min: *track_range.start(),
            max: *track_range.end(),
        }
        .validate()?;
        self.track_range = track_range;
        Ok(self)
    }

    /// Seeds `count` independent graphs using the thread-local RNG.
    pub fn seed(&self, count: usize) -> SeedReport {
        self.seed_with_rng(count, &mut rand::thread_rng())
    }

    pub fn seed_with_rng<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> SeedReport {
        info!(
            "event=seed module=service status=start count={} track_min={} track_max={}",
            count,
            self.track_range.start(),
            self.track_range.end()
        );

        let mut report = SeedReport::default();
        for iteration in 0..count {
            let (singer, album) = self.synthesize(rng);
            match self
                .creator
                .create_graph_with_rng(&singer, std::slice::from_ref(&album), rng)
            {
                Ok(created) => report.created.push(created),
                Err(err) => {
                    warn!(
                        "event=seed module=service status=error iteration={} error={}",
                        iteration, err
                    );
                    report.failures.push((iteration, err));
                }
            }
        }

        info!(
            "event=seed module=service status=ok created={} failed={}",
            report.created.len(),
            report.failures.len()
        );
        report
    }

    /// Synthesizes one singer and one album with an exact, pre-drawn track count.
    pub fn synthesize<R: Rng + ?Sized>(&self, rng: &mut R) -> (SingerSpec, AlbumSpec) {
        let mut singer = SingerSpec::new(pick(FIRST_NAMES, rng), pick(LAST_NAMES, rng));
        singer.birth_date = random_date(rng, 1940, 2000);

        let track_count = resolve_track_count(
            TrackCount::Between {
                min: *self.track_range.start(),
                max: *self.track_range.end(),
            },
            rng,
        );
        let title = format!("{} {}", pick(TITLE_ADJECTIVES, rng), pick(TITLE_NOUNS, rng));
        let mut album = AlbumSpec::new(title, TrackCount::Exact(track_count));
        album.release_date = random_date(rng, 1960, 2024);

        (singer, album)
    }
}

fn pick<'s, R: Rng + ?Sized>(pool: &[&'s str], rng: &mut R) -> &'s str {
    pool.choose(rng).copied().unwrap_or("Anonymous")
}

fn random_date<R: Rng + ?Sized>(rng: &mut R, from_year: i32, to_year: i32) -> Option<NaiveDate> {
    let year = rng.gen_range(from_year..=to_year);
    let month = rng.gen_range(1..=12);
    // Day 28 exists in every month.
    let day = rng.gen_range(1..=28);
    NaiveDate::from_ymd_opt(year, month, day)
}
