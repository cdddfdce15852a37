use iced::widget::{button, column, container, image, text, text_input};
use iced::{Alignment, Element, Length, Task, Theme};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use env_logger::{Builder, Target};
use log::LevelFilter;

mod archive;
mod config;
mod dates;
mod error;
mod state;
mod ui;

use archive::preview::{self, Preview};
use archive::ArchiveClient;
use config::{Config, CredentialMode};
use error::CredentialError;
use state::carousel::{CarouselController, Fetched, PendingLoad, SystemClock};
use state::credentials::{CredentialProvider, DemoCredential, SettingsStore, StoredCredential};
use state::fallback::FallbackPool;
use state::slot::{DisplayRef, SlotPosition};
use ui::{PreviewKey, PreviewState};

/// Which screen is showing
#[derive(Debug, Clone, PartialEq, Eq)]
enum Screen {
    /// Waiting for the user to type an API key
    NeedsKey { input: String, notice: Option<String> },
    /// Carousel mounted
    Browsing,
    /// No credential and no way to ask for one
    Unavailable(String),
}

/// Main application state
struct ApodViewer {
    config: Config,
    credentials: Box<dyn CredentialProvider>,
    pool: FallbackPool,
    /// Archive client for the mounted carousel, reused for preview downloads
    client: Option<ArchiveClient>,
    carousel: Option<CarouselController>,
    screen: Screen,
    date_input: String,
    date_notice: Option<String>,
    previews: HashMap<PreviewKey, PreviewState>,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    KeyInput(String),
    KeySubmitted,
    /// A load cycle finished; carries its generation
    Loaded(u64, Fetched),
    SlotClicked(SlotPosition),
    DateInput(String),
    DateSubmitted,
    StepDay(i64),
    PreviewLoaded(PreviewKey, Result<Preview, String>),
    /// Tear the carousel down and mount a fresh one
    Reload,
    /// Drop the stored key and ask for a new one
    ChangeKey,
}

impl ApodViewer {
    fn new() -> (Self, Task<Message>) {
        let config = Config::load();
        let credentials = credential_provider(&config);
        let pool = FallbackPool::discover_or_builtin(&config.fallback_dir);

        log::info!(
            "APOD viewer starting against {} with {} placeholders",
            config.archive_url,
            pool.len()
        );

        let mut viewer = Self::with_parts(config, credentials, pool);
        let task = viewer.setup();
        (viewer, task)
    }

    fn with_parts(config: Config, credentials: Box<dyn CredentialProvider>, pool: FallbackPool) -> Self {
        ApodViewer {
            config,
            credentials,
            pool,
            client: None,
            carousel: None,
            screen: Screen::NeedsKey {
                input: String::new(),
                notice: None,
            },
            date_input: String::new(),
            date_notice: None,
            previews: HashMap::new(),
        }
    }

    /// Resolve the credential and mount a carousel
    ///
    /// Safe to call repeatedly; each call replaces the previous instance.
    fn setup(&mut self) -> Task<Message> {
        match self.credentials.api_key() {
            Ok(Some(key)) => self.mount(key),
            Ok(None) => {
                self.unmount();
                self.screen = Screen::NeedsKey {
                    input: String::new(),
                    notice: None,
                };
                Task::none()
            }
            Err(err) => {
                self.unmount();
                log::error!("No archive credential: {}", err);
                alert(&err.to_string());
                self.screen = Screen::Unavailable(err.to_string());
                Task::none()
            }
        }
    }

    fn mount(&mut self, api_key: String) -> Task<Message> {
        self.unmount();

        let client = match ArchiveClient::new(
            self.config.archive_url.clone(),
            api_key,
            self.config.request_timeout(),
        ) {
            Ok(client) => client,
            Err(err) => {
                log::error!("Failed to create archive client: {}", err);
                self.screen = Screen::Unavailable(err.to_string());
                return Task::none();
            }
        };

        let mut carousel = CarouselController::new(
            Arc::new(client.clone()),
            self.pool.clone(),
            Arc::new(SystemClock),
            self.config.carousel_options(),
        );
        let pending = carousel.begin_startup();

        self.date_input = dates::format(carousel.state().center_date);
        self.date_notice = None;
        self.client = Some(client);
        self.carousel = Some(carousel);
        self.screen = Screen::Browsing;

        load(pending)
    }

    fn unmount(&mut self) {
        if let Some(mut carousel) = self.carousel.take() {
            carousel.teardown();
        }
        self.client = None;
        self.previews.clear();
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::KeyInput(value) => {
                if let Screen::NeedsKey { input, notice } = &mut self.screen {
                    *input = value;
                    *notice = None;
                }
                Task::none()
            }
            Message::KeySubmitted => {
                let Screen::NeedsKey { input, .. } = &self.screen else {
                    return Task::none();
                };
                match self.credentials.remember(input) {
                    Ok(key) => self.mount(key),
                    Err(err) => {
                        if matches!(err, CredentialError::Missing) {
                            alert(&err.to_string());
                        }
                        log::warn!("API key not accepted: {}", err);
                        if let Screen::NeedsKey { notice, .. } = &mut self.screen {
                            *notice = Some(err.to_string());
                        }
                        Task::none()
                    }
                }
            }
            Message::Loaded(generation, fetched) => {
                let Some(carousel) = self.carousel.as_mut() else {
                    return Task::none();
                };
                if carousel.commit(generation, fetched) {
                    self.date_input = dates::format(carousel.state().center_date);
                    self.request_previews()
                } else {
                    Task::none()
                }
            }
            Message::SlotClicked(position) => {
                match self.carousel.as_mut().and_then(|c| c.click(position)) {
                    Some(pending) => self.start(pending),
                    None => Task::none(),
                }
            }
            Message::DateInput(value) => {
                self.date_input = value;
                self.date_notice = None;
                Task::none()
            }
            Message::DateSubmitted => match dates::parse(&self.date_input) {
                Ok(date) => self.navigate(date),
                Err(_) => {
                    self.date_notice = Some(format!("\"{}\" is not a YYYY-MM-DD date", self.date_input.trim()));
                    Task::none()
                }
            },
            Message::StepDay(days) => {
                let Some(center) = self.carousel.as_ref().map(|c| c.state().center_date) else {
                    return Task::none();
                };
                self.navigate(dates::add_days(center, days))
            }
            Message::PreviewLoaded(key, result) => {
                // Dropped from the cache while loading: the slot moved on
                let Some(entry) = self.previews.get_mut(&key) else {
                    return Task::none();
                };
                *entry = match result {
                    Ok(preview) => {
                        PreviewState::Ready(image::Handle::from_rgba(preview.width, preview.height, preview.pixels))
                    }
                    Err(err) => {
                        log::warn!("{}", err);
                        PreviewState::Failed
                    }
                };
                Task::none()
            }
            Message::Reload => {
                log::info!("Reloading carousel");
                self.setup()
            }
            Message::ChangeKey => {
                if let Err(err) = self.credentials.forget() {
                    log::error!("Failed to forget API key: {}", err);
                }
                self.setup()
            }
        }
    }

    fn navigate(&mut self, date: chrono::NaiveDate) -> Task<Message> {
        match self.carousel.as_mut() {
            Some(carousel) => {
                let pending = carousel.begin_update(date);
                self.start(pending)
            }
            None => Task::none(),
        }
    }

    /// Reflect the new center in the picker and run the cycle
    fn start(&mut self, pending: PendingLoad) -> Task<Message> {
        if let Some(carousel) = &self.carousel {
            self.date_input = dates::format(carousel.state().center_date);
        }
        self.date_notice = None;
        load(pending)
    }

    /// Load previews for the visible slots, forgetting the rest
    fn request_previews(&mut self) -> Task<Message> {
        let (Some(carousel), Some(client)) = (&self.carousel, &self.client) else {
            return Task::none();
        };

        let wanted: HashSet<PreviewKey> = [SlotPosition::Before, SlotPosition::Current, SlotPosition::Next]
            .into_iter()
            .filter_map(|position| {
                carousel.state().slot(position).display_ref().map(|reference| PreviewKey {
                    reference,
                    tier: ui::carousel::tier_for(position),
                })
            })
            .collect();

        self.previews.retain(|key, _| wanted.contains(key));

        let mut tasks = Vec::new();
        for key in wanted {
            if self.previews.contains_key(&key) {
                continue;
            }
            self.previews.insert(key.clone(), PreviewState::Loading);

            let task_key = key.clone();
            let task = match key.reference {
                DisplayRef::Remote(url) => Task::perform(
                    preview::load_remote(client.http().clone(), url, key.tier),
                    move |result| Message::PreviewLoaded(task_key.clone(), result),
                ),
                DisplayRef::Local(path) => Task::perform(
                    preview::load_local(path, key.tier),
                    move |result| Message::PreviewLoaded(task_key.clone(), result),
                ),
            };
            tasks.push(task);
        }

        Task::batch(tasks)
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        match (&self.screen, &self.carousel) {
            (Screen::Browsing, Some(carousel)) => ui::carousel::view(
                carousel.state(),
                &self.previews,
                &self.date_input,
                self.date_notice.as_deref(),
                self.credentials.needs_prompt(),
            ),
            (Screen::NeedsKey { input, notice }, _) => {
                let mut content = column![
                    text("Astronomy Picture of the Day").size(36),
                    text("Enter your NASA API key").size(16),
                    text_input("API key", input)
                        .on_input(Message::KeyInput)
                        .on_submit(Message::KeySubmitted)
                        .secure(true)
                        .width(Length::Fixed(360.0))
                        .padding(10),
                    button("Continue").on_press(Message::KeySubmitted).padding(10),
                ]
                .spacing(20)
                .padding(40)
                .align_x(Alignment::Center);

                if let Some(notice) = notice {
                    content = content.push(text(notice).size(14));
                }

                centered(content.into())
            }
            (Screen::Unavailable(reason), _) => unavailable(reason),
            (Screen::Browsing, None) => unavailable("Carousel not mounted"),
        }
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn unavailable(reason: &str) -> Element<'_, Message> {
    centered(
        column![
            text("Astronomy Picture of the Day").size(36),
            text(reason).size(16),
            button("Retry").on_press(Message::Reload).padding(10),
        ]
        .spacing(20)
        .align_x(Alignment::Center)
        .into(),
    )
}

fn centered(content: Element<'_, Message>) -> Element<'_, Message> {
    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}

/// Run the network half of a cycle in the background
fn load(pending: PendingLoad) -> Task<Message> {
    let generation = pending.generation;
    Task::perform(pending.future, move |fetched| Message::Loaded(generation, fetched))
}

/// Pick the credential strategy for the configured mode
fn credential_provider(config: &Config) -> Box<dyn CredentialProvider> {
    match config.credential_mode {
        CredentialMode::Demo => Box::new(DemoCredential::new(config.demo_key.clone())),
        CredentialMode::Prompt => match SettingsStore::open_default() {
            Ok(store) => Box::new(StoredCredential::new(store)),
            Err(err) => {
                log::error!("Settings unavailable ({}), using the demo key", err);
                Box::new(DemoCredential::new(config.demo_key.clone()))
            }
        },
    }
}

/// Native warning dialog
fn alert(message: &str) {
    let _ = rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Warning)
        .set_title("APOD Viewer")
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

fn init_logger() {
    Builder::new()
        .target(Target::Stdout)
        .filter_level(LevelFilter::Warn)
        .filter_module("apod_viewer", LevelFilter::Debug)
        .init();
}

fn main() -> iced::Result {
    if std::env::var("RUST_LOG").is_err() {
        init_logger();
    } else {
        env_logger::init();
    }

    iced::application(
        "APOD Viewer",
        ApodViewer::update,
        ApodViewer::view,
    )
    .theme(ApodViewer::theme)
    .centered()
    .run_with(ApodViewer::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ImageRecord;
    use crate::archive::record::MediaKind;
    use crate::state::carousel::{LoadPhase, UpdateRecords};

    fn ymd(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn viewer() -> ApodViewer {
        let config = Config {
            // Nothing listens here; no task is ever driven in these tests
            archive_url: "http://127.0.0.1:9/apod".to_string(),
            credential_mode: CredentialMode::Demo,
            ..Config::default()
        };
        let credentials = Box::new(DemoCredential::new(config.demo_key.clone()));
        ApodViewer::with_parts(config, credentials, FallbackPool::builtin())
    }

    fn update_for(date: chrono::NaiveDate) -> Fetched {
        let record = ImageRecord {
            date,
            title: format!("Picture of {}", date),
            explanation: String::new(),
            media_kind: MediaKind::Image,
            url: Some(format!("https://example.org/{}.jpg", date)),
            thumbnail_url: None,
            hdurl: None,
            copyright: None,
        };
        Fetched::Update {
            prev: dates::add_days(date, -1),
            center: date,
            next_raw: dates::add_days(date, 1),
            outcome: Ok(UpdateRecords {
                range: vec![record],
                substitute: None,
            }),
        }
    }

    #[tokio::test]
    async fn test_reload_mounts_a_fresh_carousel() {
        let mut app = viewer();
        let _ = app.setup();
        assert_eq!(app.screen, Screen::Browsing);

        let _ = app.update(Message::DateInput("2020-01-02".to_string()));
        let _ = app.update(Message::DateSubmitted);
        let old_generation = app.carousel.as_ref().unwrap().generation();
        assert_eq!(app.carousel.as_ref().unwrap().state().center_date, ymd(2020, 1, 2));

        let _ = app.update(Message::Reload);
        assert_eq!(app.screen, Screen::Browsing);
        let carousel = app.carousel.as_ref().unwrap();
        assert_ne!(carousel.generation(), old_generation);
        assert_eq!(carousel.state().phase, LoadPhase::Loading);

        // The torn-down instance's cycle finishes after the remount
        let _ = app.update(Message::Loaded(old_generation, update_for(ymd(2020, 1, 2))));
        let state = app.carousel.as_ref().unwrap().state();
        assert_eq!(state.phase, LoadPhase::Loading);
        assert!(state.current.is_empty());
        assert!(app.previews.is_empty());
    }

    #[tokio::test]
    async fn test_current_cycle_still_commits_after_reload() {
        let mut app = viewer();
        let _ = app.setup();
        let _ = app.update(Message::Reload);

        let _ = app.update(Message::DateInput("2021-07-04".to_string()));
        let _ = app.update(Message::DateSubmitted);
        let generation = app.carousel.as_ref().unwrap().generation();

        let _ = app.update(Message::Loaded(generation, update_for(ymd(2021, 7, 4))));
        let state = app.carousel.as_ref().unwrap().state();
        assert_eq!(state.current.navigable_date(), Some(ymd(2021, 7, 4)));
        assert_eq!(state.title, "Picture of 2021-07-04");
        assert_eq!(app.date_input, "2021-07-04");
    }
}
