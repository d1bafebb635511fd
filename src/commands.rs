use std::path::Path;

use anyhow::{Result, bail};
use cli_table::{Cell, CellStruct, Style, Table, format::Justify, print_stdout};

use crate::config::{Config, StorageObject};
use crate::transfer::{UploadPlan, plan_upload, scan_folder};
use crate::util::human_bytes;

/// Fields changed by `rp set`; `None` leaves the stored value alone.
#[derive(Debug, Default)]
pub struct SetArgs {
    pub endpoint: Option<String>,
    pub base_url: Option<String>,
    pub cookie: Option<String>,
    pub level: Option<i64>,
    pub timeout: Option<u64>,
    pub retries: Option<usize>,
}

pub fn handle_scan(folder: &Path, include_loose: bool) -> Result<()> {
    let set = scan_folder(folder)?;
    let plan = plan_upload(&set, include_loose)?;
    show_plan_table(&plan)?;
    println!(
        "{} group(s), {} video file(s), {}",
        plan.groups.len(),
        plan.accepted_count(),
        human_bytes(plan.total_size())
    );
    if !plan.rejected.is_empty() {
        println!("⚠️ {} file(s) skipped (not a supported video type)", plan.rejected.len());
    }
    if !plan.loose.is_empty() {
        println!(
            "⚠️ {} file(s) directly under '{}' skipped; use --include-loose to add them",
            plan.loose.len(),
            plan.root_name
        );
    }
    Ok(())
}

pub fn show_plan_table(plan: &UploadPlan) -> Result<()> {
    let title = vec![
        "Group".cell().bold(true),
        "Archive".cell().bold(true),
        "Files".cell().bold(true),
        "Size".cell().bold(true),
    ];
    let mut table: Vec<Vec<CellStruct>> = Vec::new();
    for g in &plan.groups {
        table.push(vec![
            g.name.as_str().cell(),
            format!("{}.zip", g.name).cell(),
            g.files.len().cell().justify(Justify::Right),
            human_bytes(g.total_size()).cell().justify(Justify::Right),
        ]);
    }
    print_stdout(table.table().title(title))?;
    Ok(())
}

pub fn handle_set(config: &Config, args: SetArgs) -> Result<()> {
    if let Some(l) = args.level
        && !(1..=9).contains(&l)
    {
        bail!("compression level must be between 1 and 9, got {}", l);
    }
    let mut c = config.clone();
    if let Some(e) = args.endpoint {
        c.endpoint = Some(e);
    }
    if let Some(b) = args.base_url {
        c.base_url = Some(b);
    }
    if let Some(k) = args.cookie {
        c.cookie = Some(k);
    }
    if let Some(l) = args.level {
        c.compression_level = l;
    }
    if let Some(t) = args.timeout {
        c.timeout_secs = t;
    }
    if let Some(r) = args.retries {
        c.max_retries = r.max(1);
    }
    let path = c.save()?;
    println!("✅ configuration saved to {}", path.display());
    Ok(())
}

pub fn handle_show(config: &Config) -> Result<()> {
    println!("{}", redacted(config).pretty_json());
    Ok(())
}

// Cookie values are session credentials; never echo them back in full.
fn redacted(config: &Config) -> Config {
    let mut c = config.clone();
    if let Some(cookie) = c.cookie.as_mut() {
        *cookie = mask_cookie(cookie);
    }
    c
}

fn mask_cookie(header: &str) -> String {
    header
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, _)) => format!("{}=***", k.trim()),
            None => "***".to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_level_is_an_error() {
        let args = SetArgs {
            endpoint: Some("https://x.test/u".into()),
            level: Some(0),
            ..SetArgs::default()
        };
        let err = handle_set(&Config::default(), args).unwrap_err();
        assert!(err.to_string().contains("between 1 and 9"));
    }

    #[test]
    fn cookie_values_are_masked() {
        assert_eq!(mask_cookie("sessionid=abc; csrftoken=xyz"), "sessionid=***; csrftoken=***");
        assert_eq!(mask_cookie("lonely"), "***");
        let c = Config { cookie: Some("a=1".into()), ..Config::default() };
        assert_eq!(redacted(&c).cookie.as_deref(), Some("a=***"));
    }
}
