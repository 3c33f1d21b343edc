use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use parachute::cli::{
    handle_backup_command, handle_pack_command, handle_restore_command, handle_unpack_command,
    handle_version_command, BackupArgs, PackArgs, RestoreArgs, UnpackArgs,
};
use parachute::config::{ConfigPaths, Overrides, Settings};
use parachute::logging::{self, LogFormat};

#[derive(Parser)]
#[command(
    name = "parachute",
    version,
    about = "A backup utility for S3 compatible storages",
    long_about = "parachute packs files and directories into zip archives, encrypts them \
                  with a passphrase and moves them to or from S3 compatible object storage. \
                  Encrypted archives are compatible with `openssl enc -aes-256-cbc -pbkdf2 -md sha256`."
)]
struct Cli {
    /// Config file, or a directory containing parachute.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity of the output (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "PARACHUTE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Logging format
    #[arg(long, global = true, value_enum, env = "PARACHUTE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Prevent archive encryption
    #[arg(short = 'E', long, global = true, env = "PARACHUTE_NO_ENCRYPTION")]
    no_encryption: bool,

    /// Encryption passphrase
    #[arg(
        short = 'p',
        long = "pass",
        global = true,
        env = "PARACHUTE_PASSPHRASE",
        hide_env_values = true
    )]
    passphrase: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an (encrypted) archive of files and directories
    Pack(PackArgs),

    /// Extract an (encrypted) archive into a directory
    Unpack(UnpackArgs),

    /// Create an (encrypted) archive of LOCAL and upload it to the remote
    Backup(BackupArgs),

    /// Download an (encrypted) archive from the remote and extract it into LOCAL
    Restore(RestoreArgs),

    /// Print the parachute version
    Version,
}

impl Cli {
    /// Flag and environment values that override the configuration file
    fn overrides(&self) -> Overrides {
        let mut overrides = Overrides {
            passphrase: self.passphrase.clone(),
            no_encryption: self.no_encryption,
            log_level: self.log_level.clone(),
            log_format: self.log_format,
            ..Overrides::default()
        };

        match &self.command {
            Commands::Pack(args) => overrides.output = args.output.clone(),
            Commands::Unpack(args) => overrides.output = args.output.clone(),
            Commands::Backup(args) => args.remote.apply_to(&mut overrides),
            Commands::Restore(args) => args.remote.apply_to(&mut overrides),
            Commands::Version => {}
        }

        overrides
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Version output needs neither configuration nor logging
    if matches!(cli.command, Commands::Version) {
        handle_version_command();
        return Ok(());
    }

    let paths = ConfigPaths::new(cli.config.as_deref());
    let mut settings = Settings::load(&paths)?;
    settings.apply(cli.overrides());

    logging::init(&settings.log_level, settings.log_format)?;

    match cli.command {
        Commands::Pack(args) => handle_pack_command(&settings, args)?,
        Commands::Unpack(args) => handle_unpack_command(&settings, args)?,
        Commands::Backup(args) => handle_backup_command(&settings, args)?,
        Commands::Restore(args) => handle_restore_command(&settings, args)?,
        Commands::Version => handle_version_command(),
    }

    Ok(())
}
