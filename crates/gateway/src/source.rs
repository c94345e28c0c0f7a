//! Abertura da fonte de bytes e argumentos de linha de comando.

use plant_core::config::SourceConfig;
use plant_core::framer::{LineFramer, ZeroReadPolicy};
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

/// Argumentos reconhecidos.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    /// `--config <path>`
    pub config: Option<PathBuf>,
    /// `--stdin`: lê da entrada padrão (replay de logs capturados)
    pub stdin: bool,
    /// `--dry-run`: destinos só registram no log
    pub dry_run: bool,
}

impl Args {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut parsed = Args::default();
        let mut it = args.into_iter();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--config" => {
                    let path = it.next().ok_or("--config exige um caminho")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--stdin" => parsed.stdin = true,
                "--dry-run" => parsed.dry_run = true,
                other => return Err(format!("Argumento desconhecido: {other}")),
            }
        }
        Ok(parsed)
    }
}

/// Abre a fonte configurada. O dispositivo serial é aberto como arquivo;
/// baud e modo de linha ficam a cargo do sistema (p.ex. `stty`).
pub fn open_framer(
    cfg: &SourceConfig,
    use_stdin: bool,
) -> io::Result<LineFramer<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if use_stdin {
        Box::new(io::stdin())
    } else {
        Box::new(File::open(&cfg.device)?)
    };
    Ok(framer_for(reader, cfg))
}

/// Tanto o tty bloqueante quanto o stdin só devolvem 0 bytes quando a outra
/// ponta fechou (cabo USB removido, fim do replay): os dois usam
/// [`ZeroReadPolicy::Disconnect`].
pub fn framer_for<R: Read>(reader: R, cfg: &SourceConfig) -> LineFramer<R> {
    LineFramer::new(reader)
        .with_max_line_bytes(cfg.max_line_bytes)
        .with_zero_read_policy(ZeroReadPolicy::Disconnect)
}
