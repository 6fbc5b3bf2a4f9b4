//! Gallery walk: log in, pick a room and folder, then check every photo
//! and mark the ones showing a target.
//!
//! Photos are handled strictly one at a time. A failure on one photo is
//! logged and counted, and the walk moves on; only navigation and prompt
//! failures end the walk.

use crate::credentials::Credentials;
use crate::fetcher::{FetchError, PhotoFetcher};
use crate::prompt::{Chooser, PromptError};
use crate::site::{GallerySite, PhotoEntry, SiteError};
use photopick_core::{FaceEncoder, MatchEngine, MatchError, Matcher};
use std::time::Duration;
use thiserror::Error;

/// Courtesy pause between photos.
pub const DEFAULT_PACING: Duration = Duration::from_millis(500);

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("site navigation failed: {0}")]
    Site(#[from] SiteError),
    #[error("selection aborted: {0}")]
    Prompt(#[from] PromptError),
    #[error("chooser returned option {index} of {count}")]
    InvalidChoice { index: usize, count: usize },
}

/// Why a single photo was skipped.
#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("no image URL in listing")]
    MissingUrl,
    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("matching failed: {0}")]
    Match(#[from] MatchError),
    #[error("matched '{label}' but marking failed: {source}")]
    Mark {
        label: String,
        #[source]
        source: SiteError,
    },
}

/// What happened to a photo that was processed without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoOutcome {
    Marked { label: String },
    NoMatch,
}

/// Running counters for one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub total: usize,
    /// Photos where a target was recognized (marked or not).
    pub matched: usize,
    pub marked: usize,
    pub unmatched: usize,
    /// Photos skipped because of an error, including failed marks.
    pub failed: usize,
}

/// Drives one gallery session from login to the last photo.
pub struct GalleryWalk<'a, F: ?Sized, E: ?Sized, M> {
    fetcher: &'a F,
    encoder: &'a mut E,
    engine: &'a MatchEngine<'a, M>,
    pacing: Duration,
}

impl<'a, F, E, M> GalleryWalk<'a, F, E, M>
where
    F: PhotoFetcher + ?Sized,
    E: FaceEncoder + ?Sized,
    M: Matcher,
{
    pub fn new(fetcher: &'a F, encoder: &'a mut E, engine: &'a MatchEngine<'a, M>) -> Self {
        Self { fetcher, encoder, engine, pacing: DEFAULT_PACING }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Run the walk, then release the site session whatever the outcome.
    pub async fn run_and_release<S, C>(
        &mut self,
        site: &mut S,
        chooser: &mut C,
        credentials: &Credentials,
    ) -> Result<WalkSummary, WalkError>
    where
        S: GallerySite + ?Sized,
        C: Chooser + ?Sized,
    {
        let result = self.run(site, chooser, credentials).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "gallery walk aborted");
        }
        if let Err(e) = site.shutdown().await {
            tracing::warn!(error = %e, "failed to release browser session");
        }
        result
    }

    /// Login, selection and the per-photo loop. Does not release the site.
    pub async fn run<S, C>(
        &mut self,
        site: &mut S,
        chooser: &mut C,
        credentials: &Credentials,
    ) -> Result<WalkSummary, WalkError>
    where
        S: GallerySite + ?Sized,
        C: Chooser + ?Sized,
    {
        tracing::info!(login_id = %credentials.login_id, "logging in");
        site.authenticate(&credentials.login_id, &credentials.password).await?;

        let rooms: Vec<_> = site.list_rooms().await?.into_iter().filter(|r| !r.purchased).collect();
        if rooms.is_empty() {
            tracing::warn!("no rooms available for ordering");
            return Ok(WalkSummary::default());
        }
        let labels: Vec<String> = rooms.iter().map(|r| format!("{} (status: {})", r.title, r.status)).collect();
        let room = pick(&rooms, chooser.choose("Choose a room to process", &labels).await?)?;
        site.open_room(room).await?;

        let folders = site.list_folders().await?;
        if folders.is_empty() {
            tracing::warn!(room = %room.title, "no folders in room");
            return Ok(WalkSummary::default());
        }
        let labels: Vec<String> = folders.iter().map(|f| f.title.clone()).collect();
        let folder = pick(&folders, chooser.choose("Choose a folder to process", &labels).await?)?;
        site.open_folder(folder).await?;

        let photos = site.list_photos().await?;
        tracing::info!(count = photos.len(), folder = %folder.title, "starting face matching");

        let summary = self.process_all(site, &photos).await;
        tracing::info!(
            total = summary.total,
            matched = summary.matched,
            marked = summary.marked,
            unmatched = summary.unmatched,
            failed = summary.failed,
            "all photos processed"
        );
        Ok(summary)
    }

    async fn process_all<S>(&mut self, site: &mut S, photos: &[PhotoEntry]) -> WalkSummary
    where
        S: GallerySite + ?Sized,
    {
        let total = photos.len();
        let mut summary = WalkSummary { total, ..WalkSummary::default() };

        for (i, entry) in photos.iter().enumerate() {
            let ordinal = i + 1;
            match self.process_photo(site, entry).await {
                Ok(PhotoOutcome::Marked { label }) => {
                    summary.matched += 1;
                    summary.marked += 1;
                    tracing::info!(ordinal, total, label = %label, photo = %entry.id, "target found; marked as order candidate");
                }
                Ok(PhotoOutcome::NoMatch) => {
                    summary.unmatched += 1;
                    tracing::info!(ordinal, total, "no target face");
                }
                Err(e) => {
                    if matches!(e, PhotoError::Mark { .. }) {
                        summary.matched += 1;
                    }
                    summary.failed += 1;
                    tracing::warn!(ordinal, total, photo = %entry.id, error = %e, "photo skipped");
                }
            }
            tokio::time::sleep(self.pacing).await;
        }
        summary
    }

    /// Fetch, match and (on a hit) mark one photo.
    pub async fn process_photo<S>(&mut self, site: &mut S, entry: &PhotoEntry) -> Result<PhotoOutcome, PhotoError>
    where
        S: GallerySite + ?Sized,
    {
        let url = entry.image_url.as_deref().ok_or(PhotoError::MissingUrl)?;
        let photo = self.fetcher.fetch(url).await?;
        let verdict = self.engine.evaluate(&photo, &mut *self.encoder)?;

        let Some(label) = verdict.matched_label else {
            return Ok(PhotoOutcome::NoMatch);
        };
        site.mark(&entry.id)
            .await
            .map_err(|source| PhotoError::Mark { label: label.clone(), source })?;
        Ok(PhotoOutcome::Marked { label })
    }
}

fn pick<T>(items: &[T], index: usize) -> Result<&T, WalkError> {
    items.get(index).ok_or(WalkError::InvalidChoice { index, count: items.len() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::decode_photo;
    use crate::site::{Folder, Room};
    use async_trait::async_trait;
    use image::{ImageFormat, Rgb};
    use photopick_core::testing::{PixelFaceEncoder, FAIL_PIXEL};
    use photopick_core::{PhotoCandidate, TargetIdentity, TargetRegistry, DEFAULT_TOLERANCE};
    use std::collections::HashMap;
    use std::io::Cursor;

    #[derive(Default)]
    struct FakeSite {
        rooms: Vec<Room>,
        folders: Vec<Folder>,
        photos: Vec<PhotoEntry>,
        fail_mark: Vec<String>,
        fail_open_folder: bool,
        opened_room: Option<String>,
        opened_folder: Option<String>,
        marked: Vec<String>,
        shutdowns: usize,
    }

    #[async_trait]
    impl GallerySite for FakeSite {
        async fn authenticate(&mut self, _login_id: &str, _password: &str) -> Result<(), SiteError> {
            Ok(())
        }
        async fn list_rooms(&mut self) -> Result<Vec<Room>, SiteError> {
            Ok(self.rooms.clone())
        }
        async fn open_room(&mut self, room: &Room) -> Result<(), SiteError> {
            self.opened_room = Some(room.title.clone());
            Ok(())
        }
        async fn list_folders(&mut self) -> Result<Vec<Folder>, SiteError> {
            Ok(self.folders.clone())
        }
        async fn open_folder(&mut self, folder: &Folder) -> Result<(), SiteError> {
            if self.fail_open_folder {
                return Err(SiteError::Timeout { what: "#photoListInner".into(), timeout: Duration::from_secs(10) });
            }
            self.opened_folder = Some(folder.title.clone());
            Ok(())
        }
        async fn list_photos(&mut self) -> Result<Vec<PhotoEntry>, SiteError> {
            Ok(self.photos.clone())
        }
        async fn mark(&mut self, photo_id: &str) -> Result<(), SiteError> {
            if self.fail_mark.iter().any(|id| id == photo_id) {
                return Err(SiteError::UnexpectedPage(format!("no checkbox for {photo_id}")));
            }
            self.marked.push(photo_id.to_string());
            Ok(())
        }
        async fn shutdown(&mut self) -> Result<(), SiteError> {
            self.shutdowns += 1;
            Ok(())
        }
    }

    /// Serves encoded PNGs by URL; unknown URLs fail with a decode error.
    #[derive(Default)]
    struct FakeFetcher {
        photos: HashMap<String, Vec<u8>>,
    }

    impl FakeFetcher {
        fn with(mut self, url: &str, faces: &[Rgb<u8>]) -> Self {
            let mut out = Cursor::new(Vec::new());
            PixelFaceEncoder::photo_with_faces(faces)
                .write_to(&mut out, ImageFormat::Png)
                .unwrap();
            self.photos.insert(url.to_string(), out.into_inner());
            self
        }
    }

    #[async_trait]
    impl PhotoFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<PhotoCandidate, FetchError> {
            let bytes = self.photos.get(url).map(Vec::as_slice).unwrap_or(&b"missing"[..]);
            decode_photo(url, bytes)
        }
    }

    /// Picks pre-scripted answers and remembers what was offered.
    struct ScriptedChooser {
        answers: Vec<usize>,
        offered: Vec<Vec<String>>,
    }

    impl ScriptedChooser {
        fn new(answers: &[usize]) -> Self {
            Self { answers: answers.to_vec(), offered: Vec::new() }
        }
    }

    #[async_trait]
    impl Chooser for ScriptedChooser {
        async fn choose(&mut self, _heading: &str, options: &[String]) -> Result<usize, PromptError> {
            self.offered.push(options.to_vec());
            if self.answers.is_empty() {
                return Err(PromptError::Closed);
            }
            Ok(self.answers.remove(0))
        }
    }

    const ALICE: Rgb<u8> = Rgb([100, 0, 0]);
    const BOB: Rgb<u8> = Rgb([0, 100, 0]);
    const STRANGER: Rgb<u8> = Rgb([0, 0, 250]);

    fn registry() -> TargetRegistry {
        TargetRegistry::from_identities(vec![
            TargetIdentity { label: "alice".into(), vector: PixelFaceEncoder::vector_for(ALICE) },
            TargetIdentity { label: "bob".into(), vector: PixelFaceEncoder::vector_for(BOB) },
        ])
    }

    fn credentials() -> Credentials {
        Credentials { login_id: "me@example.com".into(), password: "pw".into() }
    }

    fn room(title: &str, purchased: bool) -> Room {
        Room {
            title: title.into(),
            status: if purchased { "購入済".into() } else { "未購入".into() },
            link: format!("https://gallery.test/{title}"),
            purchased,
        }
    }

    fn photo(id: &str) -> PhotoEntry {
        PhotoEntry { id: id.into(), image_url: Some(format!("https://img.test/{id}.png")) }
    }

    fn site_with_photos(photos: Vec<PhotoEntry>) -> FakeSite {
        FakeSite {
            rooms: vec![room("Sports day", false)],
            folders: vec![Folder { title: "Day 1".into(), link: "https://gallery.test/f1".into() }],
            photos,
            ..FakeSite::default()
        }
    }

    #[tokio::test]
    async fn test_marks_only_matching_photos() {
        let mut site = site_with_photos(vec![photo("p1"), photo("p2"), photo("p3"), photo("p4")]);
        let fetcher = FakeFetcher::default()
            .with("https://img.test/p1.png", &[STRANGER])
            .with("https://img.test/p2.png", &[STRANGER, BOB])
            .with("https://img.test/p3.png", &[])
            .with("https://img.test/p4.png", &[ALICE]);
        let registry = registry();
        let engine = MatchEngine::new(&registry, DEFAULT_TOLERANCE).unwrap();
        let mut encoder = PixelFaceEncoder::new();
        let mut chooser = ScriptedChooser::new(&[0, 0]);

        let summary = GalleryWalk::new(&fetcher, &mut encoder, &engine)
            .with_pacing(Duration::ZERO)
            .run_and_release(&mut site, &mut chooser, &credentials())
            .await
            .unwrap();

        assert_eq!(site.marked, vec!["p2", "p4"]);
        assert_eq!(
            summary,
            WalkSummary { total: 4, matched: 2, marked: 2, unmatched: 2, failed: 0 }
        );
        assert_eq!(site.shutdowns, 1);
        assert_eq!(site.opened_folder.as_deref(), Some("Day 1"));
    }

    #[tokio::test]
    async fn test_per_photo_failures_do_not_stop_walk() {
        let mut site = site_with_photos(vec![
            photo("broken"),
            PhotoEntry { id: "nourl".into(), image_url: None },
            photo("poisoned"),
            photo("unmarkable"),
            photo("good"),
        ]);
        site.fail_mark = vec!["unmarkable".into()];
        let fetcher = FakeFetcher::default()
            .with("https://img.test/poisoned.png", &[FAIL_PIXEL])
            .with("https://img.test/unmarkable.png", &[ALICE])
            .with("https://img.test/good.png", &[BOB]);
        let registry = registry();
        let engine = MatchEngine::new(&registry, DEFAULT_TOLERANCE).unwrap();
        let mut encoder = PixelFaceEncoder::new();
        let mut chooser = ScriptedChooser::new(&[0, 0]);

        let summary = GalleryWalk::new(&fetcher, &mut encoder, &engine)
            .with_pacing(Duration::ZERO)
            .run_and_release(&mut site, &mut chooser, &credentials())
            .await
            .unwrap();

        assert_eq!(site.marked, vec!["good"]);
        assert_eq!(
            summary,
            WalkSummary { total: 5, matched: 2, marked: 1, unmatched: 0, failed: 4 }
        );
    }

    #[tokio::test]
    async fn test_purchased_rooms_not_offered() {
        let mut site = site_with_photos(Vec::new());
        site.rooms = vec![room("Old", true), room("New", false), room("Newer", false)];
        let fetcher = FakeFetcher::default();
        let registry = registry();
        let engine = MatchEngine::new(&registry, DEFAULT_TOLERANCE).unwrap();
        let mut encoder = PixelFaceEncoder::new();
        let mut chooser = ScriptedChooser::new(&[1, 0]);

        GalleryWalk::new(&fetcher, &mut encoder, &engine)
            .with_pacing(Duration::ZERO)
            .run_and_release(&mut site, &mut chooser, &credentials())
            .await
            .unwrap();

        assert_eq!(chooser.offered[0], vec!["New (status: 未購入)", "Newer (status: 未購入)"]);
        assert_eq!(site.opened_room.as_deref(), Some("Newer"));
    }

    #[tokio::test]
    async fn test_no_rooms_ends_cleanly() {
        let mut site = site_with_photos(vec![photo("p1")]);
        site.rooms = vec![room("Old", true)];
        let fetcher = FakeFetcher::default();
        let registry = registry();
        let engine = MatchEngine::new(&registry, DEFAULT_TOLERANCE).unwrap();
        let mut encoder = PixelFaceEncoder::new();
        let mut chooser = ScriptedChooser::new(&[]);

        let summary = GalleryWalk::new(&fetcher, &mut encoder, &engine)
            .run_and_release(&mut site, &mut chooser, &credentials())
            .await
            .unwrap();

        assert_eq!(summary, WalkSummary::default());
        assert!(chooser.offered.is_empty());
        assert_eq!(site.shutdowns, 1);
    }

    #[tokio::test]
    async fn test_navigation_failure_still_releases_site() {
        let mut site = site_with_photos(vec![photo("p1")]);
        site.fail_open_folder = true;
        let fetcher = FakeFetcher::default();
        let registry = registry();
        let engine = MatchEngine::new(&registry, DEFAULT_TOLERANCE).unwrap();
        let mut encoder = PixelFaceEncoder::new();
        let mut chooser = ScriptedChooser::new(&[0, 0]);

        let err = GalleryWalk::new(&fetcher, &mut encoder, &engine)
            .run_and_release(&mut site, &mut chooser, &credentials())
            .await
            .unwrap_err();

        assert!(matches!(err, WalkError::Site(SiteError::Timeout { .. })));
        assert_eq!(site.shutdowns, 1);
        assert_eq!(encoder.calls, 0);
    }

    #[tokio::test]
    async fn test_closed_prompt_aborts_and_releases() {
        let mut site = site_with_photos(vec![photo("p1")]);
        let fetcher = FakeFetcher::default();
        let registry = registry();
        let engine = MatchEngine::new(&registry, DEFAULT_TOLERANCE).unwrap();
        let mut encoder = PixelFaceEncoder::new();
        let mut chooser = ScriptedChooser::new(&[0]);

        let err = GalleryWalk::new(&fetcher, &mut encoder, &engine)
            .run_and_release(&mut site, &mut chooser, &credentials())
            .await
            .unwrap_err();

        assert!(matches!(err, WalkError::Prompt(PromptError::Closed)));
        assert_eq!(site.shutdowns, 1);
    }

    #[tokio::test]
    async fn test_out_of_range_choice_is_error() {
        let mut site = site_with_photos(vec![photo("p1")]);
        let fetcher = FakeFetcher::default();
        let registry = registry();
        let engine = MatchEngine::new(&registry, DEFAULT_TOLERANCE).unwrap();
        let mut encoder = PixelFaceEncoder::new();
        let mut chooser = ScriptedChooser::new(&[5]);

        let err = GalleryWalk::new(&fetcher, &mut encoder, &engine)
            .run_and_release(&mut site, &mut chooser, &credentials())
            .await
            .unwrap_err();

        assert!(matches!(err, WalkError::InvalidChoice { index: 5, count: 1 }));
        assert!(site.opened_room.is_none());
    }

    #[tokio::test]
    async fn test_process_photo_reports_label() {
        let mut site = FakeSite::default();
        let fetcher = FakeFetcher::default().with("https://img.test/x.png", &[STRANGER, ALICE]);
        let registry = registry();
        let engine = MatchEngine::new(&registry, DEFAULT_TOLERANCE).unwrap();
        let mut encoder = PixelFaceEncoder::new();

        let outcome = GalleryWalk::new(&fetcher, &mut encoder, &engine)
            .process_photo(&mut site, &photo("x"))
            .await
            .unwrap();

        assert_eq!(outcome, PhotoOutcome::Marked { label: "alice".into() });
        assert_eq!(site.marked, vec!["x"]);
    }
}
