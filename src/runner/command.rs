use super::job::JobDescriptor;
use crate::config::Config;
use crate::launcher::JobCommand;
use std::ffi::OsString;
use std::path::PathBuf;

/// Build the program invocation for a job:
/// `<program> [<program_args>..] [<config-file>] --scene <train> --test-transforms <test>
///  --n-steps <n> --output-dir <dir> --save-snapshot <dir>/model.<ext>`
pub fn build_command(config: &Config, job: &JobDescriptor) -> JobCommand {
    let style = config.flag_style;
    let mut args: Vec<OsString> = config.program_args.iter().map(OsString::from).collect();

    if let Some(config_file) = &job.configuration.config_file {
        args.push(config.resolve(config_file).into_os_string());
    }

    args.push(style.flag("scene").into());
    args.push(job.split.train.clone().into_os_string());
    args.push(style.flag("test_transforms").into());
    args.push(job.split.test.clone().into_os_string());
    args.push(style.flag("n_steps").into());
    args.push(config.n_steps.to_string().into());
    args.push(style.flag("output_dir").into());
    args.push(job.output_dir.clone().into_os_string());
    args.push(style.flag("save_snapshot").into());
    args.push(job.snapshot_path.clone().into_os_string());

    JobCommand {
        program: program_path(config),
        args,
    }
}

/// A bare name is left for PATH lookup; anything with a separator is a path
/// under `root`.
fn program_path(config: &Config) -> PathBuf {
    if config.program.components().count() > 1 {
        config.resolve(&config.program)
    } else {
        config.program.clone()
    }
}
