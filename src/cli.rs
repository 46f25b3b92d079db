use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "ffu2img")]
#[command(version)]
#[command(about = "Replay a Full Flash Update (FFU) container into a raw disk image", long_about = None)]
#[command(after_help = "Examples:\n  \
  ffu2img flash.ffu disk.img     replay flash.ffu into disk.img\n  \
  ffu2img -l flash.ffu           list the container's stores and partitions\n  \
  ffu2img -s flash.ffu           print the estimated device size in bytes")]
pub struct Cli {
    /// FFU container path
    #[arg(value_name = "FFU")]
    pub ffu: String,

    /// Output disk image path
    #[arg(value_name = "IMAGE")]
    pub image: Option<String>,

    /// List stores and partitions instead of flashing
    #[arg(short = 'l')]
    pub list: bool,

    /// Print the estimated device size in bytes and exit
    #[arg(short = 's')]
    pub size_only: bool,

    /// Overwrite the output image WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Quiet mode (suppress progress output)
    #[arg(short = 'q')]
    pub quiet: bool,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet || self.size_only
    }
}
