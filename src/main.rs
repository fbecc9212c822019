use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, ValueEnum};
use tsuuchi::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
	Freedesktop,
	Headless,
}

/// Show a toast notification and report what happens to it.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
	#[arg(long, default_value = "tsuuchi")]
	app_name: String,
	#[arg(long, default_value = "tsuuchi.Demo")]
	aumi: String,
	#[arg(long, value_enum, default_value_t = Backend::Freedesktop)]
	backend: Backend,

	title: String,
	#[arg(default_value = "")]
	body: String,
	/// Extra body line, may be repeated
	#[arg(long = "line")]
	lines: Vec<String>,
	#[arg(long = "button")]
	buttons: Vec<String>,
	#[arg(long)]
	attribution: Option<String>,
	#[arg(long)]
	image: Option<PathBuf>,
	#[arg(long)]
	sound: Option<SoundFile>,
	/// Audio file played instead of a catalog sound
	#[arg(long, conflicts_with = "sound")]
	sound_file: Option<PathBuf>,
	#[arg(long, default_value = "default")]
	sound_option: SoundOption,
	#[arg(long, default_value = "system")]
	duration: DisplayDuration,
	#[arg(long, default_value = "default")]
	scenario: Scenario,
	#[arg(long)]
	expire_ms: Option<u64>,
	/// Seconds to wait for an answer before withdrawing the notification
	#[arg(long, default_value_t = 30)]
	wait: u64,
}

fn descriptor(args: &Args) -> Result<NotificationDescriptor> {
	let mut n = NotificationDescriptor::new(&args.title, &args.body)?;
	for line in &args.lines {
		n.add_line(line)?;
	}
	for button in &args.buttons {
		n.add_button(button)?;
	}
	if let Some(image) = &args.image {
		n.set_image(image);
	}
	if let Some(attribution) = &args.attribution {
		n.set_attribution(attribution)?;
	}
	if let Some(file) = args.sound {
		n.set_sound(args.sound_option, file);
	}
	if let Some(path) = &args.sound_file {
		n.set_sound_file(args.sound_option, path);
	}
	if let Some(ms) = args.expire_ms {
		n.set_expiration(Duration::from_millis(ms));
	}
	n.set_duration(args.duration).set_scenario(args.scenario);
	Ok(n)
}

#[async_std::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	init_logging();
	let args = Args::parse();

	let headless = Arc::new(HeadlessSubsystem::new());
	let subsystem: Arc<dyn Subsystem> = match args.backend {
		Backend::Freedesktop => Arc::new(FreedesktopSubsystem::new()),
		Backend::Headless => headless.clone(),
	};
	let service = NotificationService::new(subsystem);
	service.initialize(&args.app_name, &args.aumi)?;

	let (tx, rx) = flume::unbounded::<Event>();
	for kind in EventKind::ALL {
		let tx = tx.clone();
		service.register_handler(kind, Arc::new(move |e: &Event| { let _ = tx.send(*e); }));
	}

	let id = service.show(descriptor(&args)?)?;
	println!("{}: shown via {}", id, service.properties().name);

	if args.backend == Backend::Headless {
		headless.activate(id, (!args.buttons.is_empty()).then_some(0));
	}

	match async_std::future::timeout(Duration::from_secs(args.wait), rx.recv_async()).await {
		Ok(Ok(Event::Activated { id, action: None })) => println!("{}: clicked", id),
		Ok(Ok(Event::Activated { id, action: Some(i) })) => {
			let label = args.buttons.get(i).map(String::as_str).unwrap_or("?");
			println!("{}: pressed {:?}", id, label)
		}
		Ok(Ok(Event::Dismissed { id, reason })) => println!("{}: dismissed ({:?})", id, reason),
		Ok(Ok(Event::Failed { id })) => println!("{}: failed", id),
		Ok(Err(e)) => return Err(e.into()),
		Err(_) => {
			println!("{}: no answer after {}s, withdrawing", id, args.wait);
			service.hide(id)?;
		}
	}
	Ok(())
}
