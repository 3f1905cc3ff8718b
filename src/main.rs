use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use chrono::Utc;
use numpool::{
    ConstraintProfile, DEFAULT_DENSITY, Entry, PoolGen, Template, digest, from_vcf, to_vcf,
    validate_template, value_set,
};
use serde_json::json;

const HEALTHCHECK_TEMPLATE: &str = "05________";

#[derive(Debug, Clone)]
struct GenerateOpts {
    template: String,
    count: usize,
    prefix: String,
    density: f64,
    exclude: Option<PathBuf>,
    out: Option<PathBuf>,
    json: bool,
}

#[derive(Debug, Clone)]
struct InspectOpts {
    template: String,
    density: f64,
    json: bool,
}

#[derive(Debug, Clone)]
struct HealthcheckOpts {
    template: String,
    count: usize,
    json: bool,
}

#[derive(Debug, Clone)]
struct BenchOpts {
    template: String,
    count: usize,
    density: f64,
}

fn default_prefix() -> String {
    env::var("NUMPOOL_PREFIX").unwrap_or_else(|_| "Contact".to_string())
}

fn print_help() {
    eprintln!(
        "numpool - template-driven unique number batches\n\n\
Usage:\n  numpool generate --template <t> [--count <n>] [--prefix <p>] [--density <d>] [--exclude <file>] [--out <file.vcf>] [--json]\n  numpool validate <template>\n  numpool inspect <template> [--density <d>] [--json]\n  numpool healthcheck [--template <t>] [--count <n>] [--json]\n  numpool bench [--template <t>] [--count <n>] [--density <d>]\n  numpool selftest\n\n\
Templates are 10 symbols: digits stay fixed, '_' slots get filled.\n\
--exclude accepts a .vcf file, a JSON entry array, or one value per line.\n\
NUMPOOL_PREFIX overrides the default display-name prefix.\n"
    );
}

fn parse_generate_flags(args: &[String]) -> Result<GenerateOpts, String> {
    let mut opts = GenerateOpts {
        template: String::new(),
        count: 10,
        prefix: default_prefix(),
        density: DEFAULT_DENSITY,
        exclude: None,
        out: None,
        json: false,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--template" | "-t" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --template".to_string());
                }
                opts.template = args[i + 1].clone();
                i += 2;
            }
            "--count" | "-n" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --count".to_string());
                }
                opts.count = args[i + 1]
                    .parse::<usize>()
                    .map_err(|_| "invalid integer for --count".to_string())?;
                i += 2;
            }
            "--prefix" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --prefix".to_string());
                }
                opts.prefix = args[i + 1].clone();
                i += 2;
            }
            "--density" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --density".to_string());
                }
                opts.density = args[i + 1]
                    .parse::<f64>()
                    .map_err(|_| "invalid number for --density".to_string())?;
                i += 2;
            }
            "--exclude" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --exclude".to_string());
                }
                opts.exclude = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--out" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --out".to_string());
                }
                opts.out = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--json" => {
                opts.json = true;
                i += 1;
            }
            _ => return Err(format!("unknown flag: {}", args[i])),
        }
    }

    if opts.template.is_empty() {
        return Err("generate requires --template".to_string());
    }

    Ok(opts)
}

fn parse_inspect_flags(args: &[String]) -> Result<InspectOpts, String> {
    if args.is_empty() {
        return Err("inspect requires a template".to_string());
    }

    let mut opts = InspectOpts {
        template: args[0].clone(),
        density: DEFAULT_DENSITY,
        json: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--density" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --density".to_string());
                }
                opts.density = args[i + 1]
                    .parse::<f64>()
                    .map_err(|_| "invalid number for --density".to_string())?;
                i += 2;
            }
            "--json" => {
                opts.json = true;
                i += 1;
            }
            _ => return Err(format!("unknown flag: {}", args[i])),
        }
    }

    Ok(opts)
}

fn parse_healthcheck_flags(args: &[String]) -> Result<HealthcheckOpts, String> {
    let mut opts = HealthcheckOpts {
        template: HEALTHCHECK_TEMPLATE.to_string(),
        count: 5,
        json: false,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--template" | "-t" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --template".to_string());
                }
                opts.template = args[i + 1].clone();
                i += 2;
            }
            "--count" | "-n" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --count".to_string());
                }
                opts.count = args[i + 1]
                    .parse::<usize>()
                    .map_err(|_| "invalid integer for --count".to_string())?;
                i += 2;
            }
            "--json" => {
                opts.json = true;
                i += 1;
            }
            _ => return Err(format!("unknown flag: {}", args[i])),
        }
    }

    Ok(opts)
}

fn parse_bench_flags(args: &[String]) -> Result<BenchOpts, String> {
    let mut opts = BenchOpts {
        template: HEALTHCHECK_TEMPLATE.to_string(),
        count: 0,
        density: DEFAULT_DENSITY,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--template" | "-t" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --template".to_string());
                }
                opts.template = args[i + 1].clone();
                i += 2;
            }
            "--count" | "-n" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --count".to_string());
                }
                opts.count = args[i + 1]
                    .parse::<usize>()
                    .map_err(|_| "invalid integer for --count".to_string())?;
                i += 2;
            }
            "--density" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --density".to_string());
                }
                opts.density = args[i + 1]
                    .parse::<f64>()
                    .map_err(|_| "invalid number for --density".to_string())?;
                i += 2;
            }
            _ => return Err(format!("unknown flag: {}", args[i])),
        }
    }

    Ok(opts)
}

fn parse_exclusions(content: &str) -> Result<HashSet<String>, String> {
    let trimmed = content.trim_start();

    if trimmed.starts_with("BEGIN:VCARD") {
        let entries = from_vcf(content).map_err(|e| e.to_string())?;
        return Ok(value_set(&entries));
    }

    if trimmed.starts_with('[') {
        let entries: Vec<Entry> =
            serde_json::from_str(trimmed).map_err(|e| format!("invalid entry JSON: {e}"))?;
        return Ok(value_set(&entries));
    }

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn read_exclusions(path: &Path) -> Result<HashSet<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    parse_exclusions(&content)
}

fn batch_is_sound(template: &Template, batch: &[Entry]) -> bool {
    if value_set(batch).len() != batch.len() {
        return false;
    }
    if !batch.windows(2).all(|pair| pair[0].value < pair[1].value) {
        return false;
    }
    batch.iter().all(|entry| template.matches(&entry.value))
}

fn run_generate(args: &[String]) -> Result<(), String> {
    let opts = parse_generate_flags(args)?;
    let template = Template::parse(&opts.template).map_err(|e| e.to_string())?;
    let exclusions = match &opts.exclude {
        Some(path) => read_exclusions(path)?,
        None => HashSet::new(),
    };

    let pool = PoolGen::new(template, opts.density, opts.prefix.as_str());
    let batch = pool.generate_excluding(opts.count, &exclusions);

    if batch.len() < opts.count {
        eprintln!("generated {} of {} requested values", batch.len(), opts.count);
    }

    if let Some(path) = &opts.out {
        let text = to_vcf(&batch);
        fs::write(path, &text).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        println!(
            "wrote {} cards to {} sha256={}",
            batch.len(),
            path.display(),
            digest(&text)
        );
        return Ok(());
    }

    if opts.json {
        let payload = json!({
            "template": pool.template().raw(),
            "density": opts.density,
            "requested": opts.count,
            "generated": batch.len(),
            "entries": batch,
        });
        println!(
            "{}",
            serde_json::to_string(&payload).map_err(|e| e.to_string())?
        );
    } else {
        for entry in &batch {
            println!("{}", entry.value);
        }
    }

    Ok(())
}

fn run_validate(args: &[String]) -> Result<(), String> {
    if args.is_empty() {
        return Err("validate requires a template".to_string());
    }

    match validate_template(&args[0]) {
        Ok(()) => {
            println!("true");
            Ok(())
        }
        Err(err) => {
            println!("false");
            Err(err.to_string())
        }
    }
}

fn run_inspect(args: &[String]) -> Result<(), String> {
    let opts = parse_inspect_flags(args)?;
    let template = Template::parse(&opts.template).map_err(|e| e.to_string())?;
    let profile = ConstraintProfile::for_density(opts.density, template.slot_count());

    if opts.json {
        let payload = json!({
            "template": template.raw(),
            "slots": template.slot_count(),
            "slot_positions": template.slot_positions(),
            "space_size": template.space_size(),
            "density": opts.density,
            "max_repeat": profile.max_repeat,
            "allow_adjacent": profile.allow_adjacent,
            "allow_runs": profile.allow_runs,
        });
        println!(
            "{}",
            serde_json::to_string(&payload).map_err(|e| e.to_string())?
        );
    } else {
        println!("template={}", template.raw());
        println!("slots={}", template.slot_count());
        println!("space_size={}", template.space_size());
        println!("max_repeat={}", profile.max_repeat);
        println!("allow_adjacent={}", profile.allow_adjacent);
        println!("allow_runs={}", profile.allow_runs);
    }

    Ok(())
}

fn run_healthcheck(args: &[String]) -> Result<(), String> {
    let opts = parse_healthcheck_flags(args)?;
    let template = Template::parse(&opts.template).map_err(|e| e.to_string())?;
    let pool = PoolGen::with_default_density(template, default_prefix());

    let batch = pool.generate(opts.count);
    let ok = batch.len() == opts.count && batch_is_sound(pool.template(), &batch);

    if opts.json {
        let payload = json!({
            "ok": ok,
            "template": pool.template().raw(),
            "requested": opts.count,
            "generated": batch.len(),
            "checked_at": Utc::now().to_rfc3339(),
            "sample": batch.first().map(|entry| entry.value.clone()),
        });
        println!(
            "{}",
            serde_json::to_string(&payload).map_err(|e| e.to_string())?
        );
    } else {
        println!(
            "ok={} template={} generated={}",
            if ok { "true" } else { "false" },
            pool.template().raw(),
            batch.len()
        );
    }

    if ok {
        Ok(())
    } else {
        Err("healthcheck failed".to_string())
    }
}

fn run_bench(args: &[String]) -> Result<(), String> {
    let mut opts = parse_bench_flags(args)?;
    if opts.count == 0 {
        opts.count = 10_000;
    }

    let template = Template::parse(&opts.template).map_err(|e| e.to_string())?;
    let pool = PoolGen::new(template, opts.density, "bench");

    let start = Instant::now();
    let batch = pool.generate(opts.count);
    let secs = start.elapsed().as_secs_f64().max(1e-9);

    let payload = json!({
        "template": pool.template().raw(),
        "density": opts.density,
        "requested": opts.count,
        "generated": batch.len(),
        "seconds": secs,
        "values_per_sec": batch.len() as f64 / secs,
    });
    println!(
        "{}",
        serde_json::to_string(&payload).map_err(|e| e.to_string())?
    );
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() {
        print_help();
        process::exit(2);
    }

    if args[0] == "-h" || args[0] == "--help" || args[0] == "help" {
        print_help();
        return;
    }

    let cmd = args[0].as_str();
    let rest = &args[1..];

    let res = match cmd {
        "generate" => run_generate(rest),
        "validate" => run_validate(rest),
        "inspect" => run_inspect(rest),
        "healthcheck" => run_healthcheck(rest),
        "bench" => run_bench(rest),
        "selftest" => match Template::parse(HEALTHCHECK_TEMPLATE) {
            Ok(template) => {
                let pool = PoolGen::with_default_density(template, "selftest");
                let batch = pool.generate(3);
                if batch.len() == 3 && batch_is_sound(pool.template(), &batch) {
                    Ok(())
                } else {
                    Err("selftest failed: unsound batch".to_string())
                }
            }
            Err(e) => Err(e.to_string()),
        },
        _ => Err(format!("unknown command: {}", cmd)),
    };

    if let Err(err) = res {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_generate_flags_full() {
        let opts = parse_generate_flags(&argv(&[
            "--template",
            "05______1_",
            "--count",
            "25",
            "--prefix",
            "Lead",
            "--density",
            "0.6",
            "--json",
        ]))
        .unwrap();
        assert_eq!(opts.template, "05______1_");
        assert_eq!(opts.count, 25);
        assert_eq!(opts.prefix, "Lead");
        assert!((opts.density - 0.6).abs() < f64::EPSILON);
        assert!(opts.json);
        assert!(opts.exclude.is_none());
        assert!(opts.out.is_none());
    }

    #[test]
    fn test_parse_generate_requires_template() {
        assert!(parse_generate_flags(&argv(&["--count", "5"])).is_err());
    }

    #[test]
    fn test_parse_generate_rejects_unknown_flag() {
        assert!(parse_generate_flags(&argv(&["--template", "05________", "--frobnicate"])).is_err());
    }

    #[test]
    fn test_parse_generate_rejects_missing_or_bad_values() {
        assert!(parse_generate_flags(&argv(&["--template"])).is_err());
        assert!(parse_generate_flags(&argv(&["--template", "05________", "--count"])).is_err());
        assert!(
            parse_generate_flags(&argv(&["--template", "05________", "--count", "many"])).is_err()
        );
        assert!(
            parse_generate_flags(&argv(&["--template", "05________", "--density", "thick"]))
                .is_err()
        );
    }

    #[test]
    fn test_parse_generate_paths() {
        let opts = parse_generate_flags(&argv(&[
            "--template",
            "05________",
            "--exclude",
            "old.vcf",
            "--out",
            "new.vcf",
        ]))
        .unwrap();
        assert_eq!(opts.exclude.as_deref(), Some(Path::new("old.vcf")));
        assert_eq!(opts.out.as_deref(), Some(Path::new("new.vcf")));
    }

    #[test]
    fn test_parse_inspect_defaults() {
        let opts = parse_inspect_flags(&argv(&["05______1_"])).unwrap();
        assert_eq!(opts.template, "05______1_");
        assert!((opts.density - DEFAULT_DENSITY).abs() < f64::EPSILON);
        assert!(!opts.json);
        assert!(parse_inspect_flags(&[]).is_err());
    }

    #[test]
    fn test_parse_healthcheck_defaults() {
        let opts = parse_healthcheck_flags(&[]).unwrap();
        assert_eq!(opts.template, HEALTHCHECK_TEMPLATE);
        assert_eq!(opts.count, 5);
        assert!(!opts.json);
    }

    #[test]
    fn test_parse_bench_defaults() {
        let opts = parse_bench_flags(&argv(&["--count", "500"])).unwrap();
        assert_eq!(opts.template, HEALTHCHECK_TEMPLATE);
        assert_eq!(opts.count, 500);
    }

    #[test]
    fn test_parse_exclusions_plain_lines() {
        let set = parse_exclusions("0512345678\n\n  0500000000  \n").unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("0512345678"));
        assert!(set.contains("0500000000"));
    }

    #[test]
    fn test_parse_exclusions_vcf() {
        let text = "BEGIN:VCARD\nVERSION:3.0\nFN:A\nTEL;TYPE=CELL:0512345678\nEND:VCARD\n";
        let set = parse_exclusions(text).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains("0512345678"));
    }

    #[test]
    fn test_parse_exclusions_entry_json() {
        let text = r#"[{"id":"1","value":"0512345678","name":"X 1","persisted":true}]"#;
        let set = parse_exclusions(text).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains("0512345678"));
        assert!(parse_exclusions("[not json").is_err());
    }

    #[test]
    fn test_batch_is_sound_flags_disorder_duplicates_and_mismatch() {
        let template = Template::parse("000000000_").unwrap();
        let entry = |value: &str| Entry {
            id: "1".to_string(),
            value: value.to_string(),
            name: "X".to_string(),
            persisted: false,
        };

        assert!(batch_is_sound(&template, &[]));
        assert!(batch_is_sound(
            &template,
            &[entry("0000000001"), entry("0000000002")]
        ));
        assert!(!batch_is_sound(
            &template,
            &[entry("0000000002"), entry("0000000001")]
        ));
        assert!(!batch_is_sound(
            &template,
            &[entry("0000000001"), entry("0000000001")]
        ));
        assert!(!batch_is_sound(&template, &[entry("1111111111")]));
    }
}
