use std::{
    cell::{Cell, RefCell},
    fs::OpenOptions,
    io::{Write, stdout},
    rc::Rc,
    thread,
    time::{Duration, Instant},
};

use anyhow::Result;
use crossbeam::channel::{self, select};
use crossterm::{
    ExecutableCommand,
    cursor::Show,
    event::{DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use unicode_width::UnicodeWidthStr;

use textui::color::{self, ColorSet};
use textui::{
    CancelArgs, DrawArgs, KeyArgs, KeyChord, Point, ScrollBounds, Size, Surface, WindowHandler,
    WindowId, WindowTree,
};

/// How long a message stays in the status line
const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const TICK: Duration = Duration::from_millis(250);
const SAVE: KeyChord = KeyChord::new(KeyCode::Char('s'), KeyModifiers::CONTROL);

fn main() -> Result<()> {
    let mut args = std::env::args();
    let _program_name = args.next();
    let log_path = args.next().unwrap_or_else(|| "textui.log".to_string());
    let log_file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open(&log_path)?;
    let (log_writer, _log_guard) = tracing_appender::non_blocking(log_file);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_writer(log_writer)
        .with_ansi(false)
        .init();

    info!(
        "textui starting, colors={} level={:?}",
        color::supports_colors(),
        color::color_level()
    );

    terminal::enable_raw_mode()?;
    stdout()
        .execute(EnterAlternateScreen)?
        .execute(EnableBracketedPaste)?;

    let result = run();

    // Always restore terminal state, even if run() fails
    stdout()
        .execute(DisableBracketedPaste)?
        .execute(LeaveAlternateScreen)?
        .execute(Show)?;
    terminal::disable_raw_mode()?;

    if let Err(err) = &result {
        error!("textui failed: {err:#}");
    }
    info!("textui shutting down");
    result
}

fn run() -> Result<()> {
    let (width, height) = terminal::size()?;
    let colors = ColorSet::for_level(color::color_level());
    let mut tree = WindowTree::with_colors(width, height, colors);
    let demo = Demo::build(&mut tree)?;
    let mut surface = Surface::new(width, height);
    demo.layout(&mut tree, surface.size());
    let mut out = stdout();

    let (events_tx, events) = channel::unbounded();
    thread::spawn(move || {
        loop {
            match crossterm::event::read() {
                Ok(event) => {
                    if events_tx.send(event).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    error!("reading terminal events failed: {err}");
                    break;
                }
            }
        }
    });
    let ticks = channel::tick(TICK);
    let mut status_since: Option<Instant> = None;

    loop {
        tree.repaint(&mut surface)?;
        tree.repaint_cursor(&mut surface);
        let written = surface.flush(&mut out)?;
        out.flush()?;
        if written > 0 {
            debug!("flushed {written} cells");
        }

        let status_before = tree.status().map(str::to_owned);
        let event = select! {
            recv(events) -> event => Some(event),
            recv(ticks) -> _ => None,
        };
        match event.transpose()? {
            Some(Event::Key(key)) => {
                if key.kind != KeyEventKind::Release && key.code == KeyCode::Esc {
                    break;
                }
                tree.process_key(key);
            }
            Some(Event::Resize(width, height)) => {
                info!("terminal resized to {width}x{height}");
                surface.resize(width, height);
                demo.layout(&mut tree, surface.size());
                let root = tree.root();
                tree.invalidate_all(root);
            }
            Some(_) => {}
            None => {
                if status_since.is_some_and(|since| since.elapsed() >= STATUS_TIMEOUT) {
                    tree.clear_status();
                }
            }
        }

        if tree.status() != status_before.as_deref() {
            status_since = tree.status().map(|_| Instant::now());
            tree.invalidate(demo.status);
        }
    }
    Ok(())
}

/// The windows of the demo form the event loop needs to reach
struct Demo {
    status: WindowId,
}

impl Demo {
    fn build(tree: &mut WindowTree) -> Result<Demo> {
        let root = tree.root();

        let status = tree.create_with(Rc::new(StatusLine));
        tree.set_tab_stop(status, false);
        tree.set_parent(status, Some(root))?;

        let history = Rc::new(History::default());
        let history_window = tree.create_with(history.clone());
        tree.set_border(history_window, true);
        tree.set_caption(history_window, Some("Saved".into()));
        tree.set_scroll_bar(history_window, true);
        tree.set_position(history_window, 44, 1);
        tree.set_size(history_window, 26, 7);
        tree.set_tab_index(history_window, 3);
        tree.set_parent(history_window, Some(root))?;

        let form_window = tree.create();
        tree.set_border(form_window, true);
        tree.set_caption(form_window, Some("Film".into()));
        tree.set_tab_stop(form_window, false);
        tree.set_position(form_window, 1, 1);
        tree.set_size(form_window, 40, 7);
        tree.set_parent(form_window, Some(root))?;

        let title = Rc::new(Field::new("Title", check_title));
        let year = Rc::new(Field::new("Year", check_year));
        let form = Rc::new(Form {
            title: title.clone(),
            year: year.clone(),
            history,
            history_window,
        });

        // Attached bottom-up so the empty title is never asked to give up focus
        let button = tree.create_with(Rc::new(Button {
            text: "[ Save ]",
            form: form.clone(),
        }));
        tree.set_tab_index(button, 2);
        tree.set_position(button, 10, 5);
        tree.set_size(button, 8, 1);
        tree.set_parent(button, Some(form_window))?;
        add_field(tree, form_window, year, 3, 1)?;
        add_field(tree, form_window, title, 1, 0)?;

        tree.add_handler(root, Rc::new(Shortcuts { form }));
        Ok(Demo { status })
    }

    fn layout(&self, tree: &mut WindowTree, size: Size) {
        let root = tree.root();
        tree.set_size(root, size.width, size.height);
        tree.set_position(self.status, 0, size.height.saturating_sub(1) as i16);
        tree.set_size(self.status, size.width, 1);
    }
}

fn add_field(
    tree: &mut WindowTree,
    form: WindowId,
    field: Rc<Field>,
    row: i16,
    tab_index: i16,
) -> Result<()> {
    let label = tree.create_with(Rc::new(Label { text: field.name }));
    tree.set_tab_stop(label, false);
    tree.set_position(label, 1, row);
    tree.set_size(label, 8, 1);
    tree.set_parent(label, Some(form))?;

    let window = tree.create_with(field);
    tree.set_tab_index(window, tab_index);
    tree.set_position(window, 10, row);
    tree.set_size(window, 28, 1);
    tree.set_parent(window, Some(form))?;
    Ok(())
}

fn check_title(text: &str) -> Result<(), String> {
    if text.trim().is_empty() {
        return Err("Title is required".into());
    }
    Ok(())
}

fn check_year(text: &str) -> Result<(), String> {
    if text.is_empty() || (text.len() == 4 && text.chars().all(|ch| ch.is_ascii_digit())) {
        Ok(())
    } else {
        Err(format!("\"{text}\" is not a year"))
    }
}

/// Static text
struct Label {
    text: &'static str,
}

impl WindowHandler for Label {
    fn draw_content(
        &self,
        _tree: &WindowTree,
        _window: WindowId,
        args: &mut DrawArgs<'_>,
    ) -> Result<()> {
        args.surface.move_to(0, 0).write(self.text);
        Ok(())
    }
}

/// Single-line text input that refuses to lose focus while its text is bad
struct Field {
    name: &'static str,
    text: RefCell<String>,
    check: fn(&str) -> Result<(), String>,
}

impl Field {
    fn new(name: &'static str, check: fn(&str) -> Result<(), String>) -> Self {
        Self {
            name,
            text: RefCell::default(),
            check,
        }
    }

    fn text(&self) -> String {
        self.text.borrow().clone()
    }

    fn place_cursor(&self, tree: &mut WindowTree, window: WindowId) {
        let width = self.text.borrow().width().min(i16::MAX as usize) as i16;
        tree.set_cursor(window, Point::new(width, 0));
    }
}

impl WindowHandler for Field {
    fn load(&self, tree: &mut WindowTree, window: WindowId) {
        tree.set_cursor_visible(window, true);
        self.place_cursor(tree, window);
    }

    fn key_down(&self, tree: &mut WindowTree, window: WindowId, args: &mut KeyArgs) {
        match (args.code, args.ch) {
            (KeyCode::Backspace, _) => {
                self.text.borrow_mut().pop();
            }
            (_, Some(ch)) => self.text.borrow_mut().push(ch),
            _ => return,
        }
        args.handled = true;
        tree.invalidate(window);
        self.place_cursor(tree, window);
    }

    fn validating(&self, tree: &mut WindowTree, _window: WindowId, args: &mut CancelArgs) {
        if let Err(message) = (self.check)(&self.text.borrow()) {
            debug!("field {} refused to let go: {message}", self.name);
            args.cancel = true;
            tree.set_status(message);
        }
    }

    fn draw_content(
        &self,
        _tree: &WindowTree,
        _window: WindowId,
        args: &mut DrawArgs<'_>,
    ) -> Result<()> {
        args.surface.move_to(0, 0).write(&self.text.borrow());
        Ok(())
    }
}

struct Form {
    title: Rc<Field>,
    year: Rc<Field>,
    history: Rc<History>,
    history_window: WindowId,
}

impl Form {
    /// Only called once the focused control has validated
    fn save(&self, tree: &mut WindowTree) {
        let title = self.title.text();
        let year = self.year.text();
        let entry = if year.is_empty() {
            title
        } else {
            format!("{title} ({year})")
        };
        info!("saving {entry}");
        tree.set_status(format!("Saved {entry}"));
        self.history.push(tree, self.history_window, entry);
    }
}

struct Button {
    text: &'static str,
    form: Rc<Form>,
}

impl WindowHandler for Button {
    fn key_down(&self, tree: &mut WindowTree, _window: WindowId, args: &mut KeyArgs) {
        if matches!(args.code, KeyCode::Enter | KeyCode::Char(' ')) {
            args.handled = true;
            tree.if_validate_ok(|tree| self.form.save(tree));
        }
    }

    fn draw_content(
        &self,
        _tree: &WindowTree,
        _window: WindowId,
        args: &mut DrawArgs<'_>,
    ) -> Result<()> {
        args.surface.move_to(0, 0).write(self.text);
        Ok(())
    }
}

/// Application-wide keys, subscribed on the root
struct Shortcuts {
    form: Rc<Form>,
}

impl WindowHandler for Shortcuts {
    fn key_down(&self, tree: &mut WindowTree, _window: WindowId, args: &mut KeyArgs) {
        if args.is(SAVE) {
            args.handled = true;
            if !tree.if_validate_ok(|tree| self.form.save(tree)) {
                debug!("save refused by the focused control");
            }
        }
    }
}

/// Scrollable list of saved entries
#[derive(Default)]
struct History {
    entries: RefCell<Vec<String>>,
    top: Cell<usize>,
}

impl History {
    fn push(&self, tree: &mut WindowTree, window: WindowId, entry: String) {
        self.entries.borrow_mut().push(entry);
        let len = self.entries.borrow().len();
        self.top.set(len.saturating_sub(Self::rows(tree, window)));
        self.sync(tree, window);
    }

    fn rows(tree: &WindowTree, window: WindowId) -> usize {
        tree.window(window).map_or(0, |window| window.height() as usize)
    }

    fn sync(&self, tree: &mut WindowTree, window: WindowId) {
        let total = self.entries.borrow().len();
        let first = self.top.get();
        let last = (first + Self::rows(tree, window)).min(total).saturating_sub(1);
        tree.set_scroll_bounds(
            window,
            ScrollBounds {
                first_visible: first,
                last_visible: last,
                total,
            },
        );
        tree.invalidate(window);
    }
}

impl WindowHandler for History {
    fn key_down(&self, tree: &mut WindowTree, window: WindowId, args: &mut KeyArgs) {
        let len = self.entries.borrow().len();
        let last_top = len.saturating_sub(Self::rows(tree, window));
        let top = match args.code {
            KeyCode::Up => self.top.get().saturating_sub(1),
            KeyCode::Down => (self.top.get() + 1).min(last_top),
            KeyCode::Home => 0,
            KeyCode::End => last_top,
            _ => return,
        };
        args.handled = true;
        self.top.set(top);
        self.sync(tree, window);
    }

    fn draw_content(
        &self,
        tree: &WindowTree,
        window: WindowId,
        args: &mut DrawArgs<'_>,
    ) -> Result<()> {
        let rows = Self::rows(tree, window);
        args.surface.move_to(0, 0);
        for entry in self.entries.borrow().iter().skip(self.top.get()).take(rows) {
            args.surface.writeln(entry);
        }
        Ok(())
    }
}

/// Bottom line: the last validation message, or a key hint
struct StatusLine;

impl WindowHandler for StatusLine {
    fn draw_content(
        &self,
        tree: &WindowTree,
        _window: WindowId,
        args: &mut DrawArgs<'_>,
    ) -> Result<()> {
        let text = tree
            .status()
            .unwrap_or("Tab/Shift+Tab: move  Ctrl+S: save  Ctrl+L: redraw  Esc: quit");
        args.surface.move_to(1, 0).write(text);
        Ok(())
    }
}
