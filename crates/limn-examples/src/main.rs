use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

use compact_str::CompactString;
use facet::Facet;
use figue as args;
use tracing::info;

use limn_dump::FileDumpSink;
use limn_types::{
    AliasRule, AliasTable, ElementDescriptor, ElementHandle, FaultCode, MutationKind,
    ParentChildRelation, PreviousSize,
};
use limn_watch::{
    BindingError, DumpSink, FaultSubscription, SizeWatch, TreeBinding, TreeWatcher, WatcherConfig,
};

#[derive(Facet, Debug)]
struct Cli {
    #[facet(flatten)]
    builtins: args::FigueBuiltins,
    /// Where the fault dump lands; defaults to LayoutCycle.txt in the
    /// temp directory.
    #[facet(args::named, default)]
    dump_path: Option<CompactString>,
    /// Also print the snapshot as pretty JSON.
    #[facet(args::named, default)]
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = parse_cli()?;

    let dump_path = cli
        .dump_path
        .as_ref()
        .map(|p| PathBuf::from(p.as_str()))
        .unwrap_or_else(|| std::env::temp_dir().join("LayoutCycle.txt"));

    let host = Arc::new(SimulatedHost::default());
    let sink = Arc::new(FileDumpSink::new(&dump_path));

    let config = WatcherConfig {
        dump_trigger: FaultCode::LAYOUT_CYCLE,
        aliases: AliasTable::new(vec![
            AliasRule::new(
                "RootPage/LayoutRoot (Grid)/Navigation (SplitView)/ContentRoot (Grid)/Frame/ContentPresenter/",
                "RootPage/.../",
            )
            .map_err(|e| e.to_string())?,
        ]),
    };

    let watcher = TreeWatcher::attach(
        Arc::clone(&host) as Arc<dyn TreeBinding>,
        Arc::clone(&sink) as Arc<dyn DumpSink>,
        host.install_fault_hook(),
        config,
    );

    host.wait_until_advised();

    // Static page chrome, the part the alias rule folds away.
    host.add(None, 1, 0, "App.Shell.RootPage", "", 1);
    host.add(Some(1), 2, 0, "Windows.UI.Xaml.Controls.Grid", "LayoutRoot", 1);
    host.add(Some(2), 3, 0, "Windows.UI.Xaml.Controls.SplitView", "Navigation", 1);
    host.add(Some(3), 4, 0, "Windows.UI.Xaml.Controls.Grid", "ContentRoot", 1);
    host.add(Some(4), 5, 0, "Windows.UI.Xaml.Controls.Frame", "", 1);
    host.add(Some(5), 6, 0, "Windows.UI.Xaml.Controls.ContentPresenter", "", 1);

    // Content: a list of message rows under the presenter.
    host.add(Some(6), 7, 0, "App.Chat.MessagesPage", "", 1);
    for i in 0..8u64 {
        host.add(Some(7), 10 + i, i as u32, "Windows.UI.Xaml.Controls.Grid", "", 8);
    }

    info!(
        path = %watcher.resolve_path(handle(10)),
        "first message row resolves"
    );

    // A resize storm across the rows, racing structural churn on the last
    // row, the way a reflow loop looks from the feed.
    thread::scope(|scope| {
        let storm_host = &host;
        scope.spawn(move || {
            for round in 0..40u32 {
                for i in 0..8u64 {
                    storm_host.resize(10 + i, 320.0, 24.0 + round as f32);
                }
                thread::sleep(Duration::from_millis(1));
            }
        });

        let churn_host = &host;
        scope.spawn(move || {
            for _ in 0..40u32 {
                churn_host.remove(17);
                churn_host.add(Some(7), 17, 7, "Windows.UI.Xaml.Controls.Grid", "", 8);
                thread::sleep(Duration::from_millis(1));
            }
        });
    });

    // The host's layout engine gives up; its fault hook fires.
    host.raise_fault(FaultCode::LAYOUT_CYCLE);

    let dump = std::fs::read_to_string(&dump_path)
        .map_err(|e| format!("read dump {}: {e}", dump_path.display()))?;
    println!("--- {} ---", dump_path.display());
    print!("{dump}");

    if cli.json {
        let rows = watcher.snapshot_history();
        let pretty =
            facet_json::to_string_pretty(&rows).map_err(|e| format!("encode snapshot: {e}"))?;
        println!("{pretty}");
    }

    drop(watcher);
    info!(released = !host.fault_hooked(), "watcher detached");
    Ok(())
}

fn parse_cli() -> Result<Cli, String> {
    let figue_config = args::builder::<Cli>()
        .map_err(|e| format!("failed to build CLI schema: {e}"))?
        .cli(|cli| cli.strict())
        .help(|h| {
            h.program_name("limn-examples")
                .description("Drive a simulated host tree through the limn watcher")
                .version(option_env!("CARGO_PKG_VERSION").unwrap_or("dev"))
        })
        .build();

    args::Driver::new(figue_config)
        .run()
        .into_result()
        .map(|v| v.value)
        .map_err(|e| e.to_string())
}

fn handle(raw: u64) -> ElementHandle {
    ElementHandle::new(raw).expect("non-zero")
}

/// A scripted stand-in for the instrumented host process: it accepts the
/// subscription like the real diagnostics interface would, then lets the
/// scenario deliver mutations, resizes, and faults on arbitrary threads.
#[derive(Default)]
struct SimulatedHost {
    watcher: Mutex<Option<Weak<TreeWatcher>>>,
    fault_hooked: Arc<AtomicBool>,
}

impl SimulatedHost {
    fn install_fault_hook(&self) -> FaultSubscription {
        self.fault_hooked.store(true, Ordering::Release);
        let hooked = Arc::clone(&self.fault_hooked);
        FaultSubscription::new(move || hooked.store(false, Ordering::Release))
    }

    fn fault_hooked(&self) -> bool {
        self.fault_hooked.load(Ordering::Acquire)
    }

    fn wait_until_advised(&self) {
        while self.watcher.lock().expect("host watcher slot").is_none() {
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn with_watcher(&self, deliver: impl FnOnce(&TreeWatcher)) {
        let upgraded = self
            .watcher
            .lock()
            .expect("host watcher slot")
            .as_ref()
            .and_then(Weak::upgrade);
        if let Some(watcher) = upgraded {
            deliver(&watcher);
        }
    }

    fn add(
        &self,
        parent: Option<u64>,
        child: u64,
        child_index: u32,
        type_name: &str,
        instance_name: &str,
        child_count: u32,
    ) {
        self.with_watcher(|watcher| {
            watcher.on_tree_mutation(
                ParentChildRelation {
                    parent: parent.map(handle),
                    child: handle(child),
                    child_index,
                },
                MutationKind::Add,
                &ElementDescriptor {
                    handle: handle(child),
                    type_name: CompactString::from(type_name),
                    instance_name: CompactString::from(instance_name),
                    child_count,
                },
            );
        });
    }

    fn remove(&self, raw: u64) {
        self.with_watcher(|watcher| {
            watcher.on_tree_mutation(
                ParentChildRelation {
                    parent: None,
                    child: handle(raw),
                    child_index: 0,
                },
                MutationKind::Remove,
                &ElementDescriptor {
                    handle: handle(raw),
                    type_name: CompactString::from("unused"),
                    instance_name: CompactString::new(""),
                    child_count: 0,
                },
            );
        });
    }

    fn resize(&self, raw: u64, width: f32, height: f32) {
        self.with_watcher(|watcher| {
            watcher.on_size_changed(handle(raw), PreviousSize { width, height });
        });
    }

    fn raise_fault(&self, code: FaultCode) {
        if !self.fault_hooked() {
            return;
        }
        self.with_watcher(|watcher| watcher.on_fault(code));
    }
}

impl TreeBinding for SimulatedHost {
    fn advise(&self, events: Weak<TreeWatcher>) -> Result<(), BindingError> {
        *self.watcher.lock().expect("host watcher slot") = Some(events);
        Ok(())
    }

    fn can_materialize(&self, _handle: ElementHandle) -> bool {
        true
    }

    fn watch_size(&self, _handle: ElementHandle) -> Option<SizeWatch> {
        Some(SizeWatch::untracked())
    }
}
