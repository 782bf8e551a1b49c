use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::Context;
use bell_ringer::{
    audio::{AudioPlayer, Mute, RodioPlayer},
    scheduler::LocalClock,
    speech::{CommandSpeech, SpeechEngine},
    BellRinger, Config, Day, Error,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// config file to use instead of the one in the user config directory
    #[clap(long, short)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// write the default config
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// list the voices alarms can be spoken with
    Voices,
    /// ring alarms when they are due and read commands from stdin
    Run,
    #[command(flatten)]
    Alarm(AlarmCommand),
}

#[derive(Subcommand)]
enum AlarmCommand {
    /// schedule an alarm
    Add {
        /// time of day as HH:MM
        time: String,
        /// spoken after the bell
        message: String,
        /// day the alarm rings on, can be repeated
        #[clap(long = "day", short, value_parser = parse_day)]
        days: Vec<Day>,
    },
    /// list the scheduled alarms
    List,
    /// delete the alarm with the index shown by `list`
    Delete { index: usize },
    /// speak a message right away
    Say { text: String },
    /// start the emergency alarm, it can't be stopped
    Emergency,
}

/// commands accepted by the `run` prompt
#[derive(Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct Prompt {
    #[clap(subcommand)]
    command: PromptCommand,
}

#[derive(Subcommand)]
enum PromptCommand {
    #[command(flatten)]
    Alarm(AlarmCommand),
    /// stop ringing alarms and exit
    Quit,
}

fn parse_day(s: &str) -> Result<Day, String> {
    s.parse().map_err(|e: Error| e.to_string())
}

fn main() -> anyhow::Result<()> {
    // initilize the logger
    simple_file_logger::init_logger!("bell_ringer")
        .map_err(|e| anyhow::anyhow!("couldn't initialize logger: {e:?}"))?;

    let args = Args::parse();
    let config_path = match args.config {
        Some(path) => path,
        None => Config::config_path()?,
    };

    let command = args.command.unwrap_or(Command::Run);
    if let Command::Init { force } = command {
        if force || !config_path.exists() {
            Config::new().save(&config_path)?;
            println!("wrote {}", config_path.display());
        } else {
            println!("{} already exists, use --force to overwrite it", config_path.display());
        }
        return Ok(());
    }

    let config = Config::load(&config_path)?;
    match command {
        Command::Init { .. } => Ok(()),
        Command::Voices => {
            let ringer = open(config, Output::Speech)?;
            for voice in ringer.voices()? {
                println!("{}\t{}\t{}", voice.id, voice.name, voice.language);
            }
            Ok(())
        }
        Command::Run => run(open(config, Output::Audible)?),
        Command::Alarm(command) => {
            let output = match command {
                AlarmCommand::Emergency => Output::Audible,
                AlarmCommand::Say { .. } => Output::Speech,
                AlarmCommand::Add { .. } | AlarmCommand::List | AlarmCommand::Delete { .. } => {
                    Output::Silent
                }
            };
            let ringer = open(config, output)?;
            handle(&ringer, command, true)
        }
    }
}

/// which devices a command needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    /// only edits alarms, nothing is heard
    Silent,
    /// speaks or lists voices
    Speech,
    /// bells and speech
    Audible,
}

/// Builds the bell ringer, opening only the devices `output` asks for.
/// Silent commands never start the speech program.
fn open(config: Config, output: Output) -> anyhow::Result<BellRinger> {
    let open_speech = || -> anyhow::Result<Arc<dyn SpeechEngine>> {
        let speech = CommandSpeech::new(&config.speech.program)
            .with_context(|| format!("couldn't start speech program `{}`", config.speech.program))?;
        Ok(Arc::new(speech))
    };
    let (player, speech): (Arc<dyn AudioPlayer>, Arc<dyn SpeechEngine>) = match output {
        Output::Silent => (Arc::new(Mute), Arc::new(Mute)),
        Output::Speech => (Arc::new(Mute), open_speech()?),
        Output::Audible => {
            let player = RodioPlayer::new().context("couldn't open audio output")?;
            (Arc::new(player), open_speech()?)
        }
    };
    BellRinger::new(config, player, speech).context("couldn't load alarms")
}

/// `wait` blocks on one-shot alerts, the prompt lets them ring on their own
fn handle(ringer: &BellRinger, command: AlarmCommand, wait: bool) -> anyhow::Result<()> {
    match command {
        AlarmCommand::Add {
            time,
            message,
            days,
        } => match ringer.schedule(&time, &message, days) {
            Ok(_) => println!("Alarm scheduled!"),
            Err(Error::InvalidTimeFormat(_)) => println!("Invalid time format. Please use HH:MM."),
            Err(e) => return Err(e.into()),
        },
        AlarmCommand::List => {
            for (i, rule) in ringer.alarms().iter().enumerate() {
                println!("{i}: {rule}");
            }
        }
        AlarmCommand::Delete { index } => {
            ringer.delete(index)?;
            println!("Alarm deleted.");
        }
        AlarmCommand::Say { text } => {
            let speaking = ringer.say(&text)?;
            if wait {
                speaking.join();
            }
        }
        AlarmCommand::Emergency => {
            let ringing = ringer.emergency()?;
            println!(
                "Emergency alarm ringing for {} minutes",
                ringer.config().emergency.minutes
            );
            if wait {
                ringing.join();
            }
        }
    }
    Ok(())
}

fn run(mut ringer: BellRinger) -> anyhow::Result<()> {
    ringer.start(LocalClock)?;
    println!(
        "Ringing {} alarm(s), type `help` for commands",
        ringer.alarms().len()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // no more input, keep ringing
            ringer.wait();
            return Ok(());
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(words) = shlex::split(line) else {
            println!("error: invalid quoting");
            continue;
        };
        match Prompt::try_parse_from(words) {
            Ok(Prompt {
                command: PromptCommand::Quit,
            }) => break,
            Ok(Prompt {
                command: PromptCommand::Alarm(command),
            }) => {
                if let Err(e) = handle(&ringer, command, false) {
                    println!("{e:#}");
                }
            }
            Err(e) => println!("{e}"),
        }
    }
    ringer.shutdown();
    Ok(())
}
