use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use barunits::catalog::LoadOptions;
use barunits::catalog::UnitCatalog;
use barunits::catalog::UnitProvider;
use barunits::comparison;
use barunits::comparison::BaseValues;
use barunits::game_data;
use barunits::layout::BuildGrid;
use barunits::query;
use barunits::query::Column;
use barunits::query::Filter;
use barunits::unit_defs::types::UnitProperties;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use rootcause::prelude::*;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Inspect unit, weapon and build menu data from a Beyond All Reason game checkout
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root of the game checkout (the directory containing `units/` and `luaui/`)
    #[clap(short, long, env = "GAME_REPO")]
    game_dir: PathBuf,

    /// Output format
    #[clap(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every unit the labs can produce, directly or through their constructors
    List {
        /// Column condition such as `metalcost>200`, `techlevel=2` or `ref=arm`. May be repeated.
        #[clap(short = 'F', long = "filter")]
        filters: Vec<String>,

        /// Column to sort by
        #[clap(short, long, default_value = "ref")]
        sort: String,

        /// Sort in descending order
        #[clap(short, long)]
        descending: bool,
    },
    /// Show everything known about one unit
    Show { unit: String },
    /// Compare units side by side, scaled against the largest value among them
    Compare {
        #[clap(required = true)]
        units: Vec<String>,
    },
    /// Print the build menu of a constructor or lab
    Grid { constructor: String },
    /// List constructors and labs that have a build menu
    Constructors,
    /// Write the whole catalog as JSON
    Dump,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

/// A header row plus data rows, printable in any [`OutputFormat`].
struct Rows {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Rows {
    fn new<S: Into<String>, I: IntoIterator<Item = S>>(headers: I) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn write(&self, format: OutputFormat, out: &mut impl Write) -> Result<(), Report> {
        match format {
            OutputFormat::Table => {
                let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
                for row in &self.rows {
                    for (width, cell) in widths.iter_mut().zip(row) {
                        *width = (*width).max(cell.chars().count());
                    }
                }

                let line = |cells: &[String]| {
                    cells
                        .iter()
                        .zip(&widths)
                        .map(|(cell, &width)| format!("{cell:<width$}"))
                        .collect::<Vec<_>>()
                        .join("  ")
                        .trim_end()
                        .to_string()
                };

                writeln!(out, "{}", line(&self.headers))?;
                writeln!(out, "{}", line(&widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>()))?;
                for row in &self.rows {
                    writeln!(out, "{}", line(row))?;
                }
            }
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(out);
                writer.write_record(&self.headers)?;
                for row in &self.rows {
                    writer.write_record(row)?;
                }
                writer.flush()?;
            }
            OutputFormat::Json => {
                let objects: Vec<serde_json::Map<String, serde_json::Value>> = self
                    .rows
                    .iter()
                    .map(|row| {
                        self.headers
                            .iter()
                            .cloned()
                            .zip(row.iter().cloned().map(serde_json::Value::String))
                            .collect()
                    })
                    .collect();
                serde_json::to_writer_pretty(&mut *out, &objects)?;
                writeln!(out)?;
            }
        }

        Ok(())
    }
}

fn load_catalog(game_dir: &Path) -> Result<UnitCatalog, Report> {
    let root = game_data::open_game_dir(game_dir)
        .map_err(|e| rootcause::report!("Failed to open game directory {}: {e}", game_dir.display()))?;
    let catalog = UnitCatalog::from_vfs(&root, &LoadOptions::default())
        .map_err(|e| rootcause::report!("Failed to load unit catalog: {e}"))?;

    info!(
        units = catalog.len(),
        rejected = catalog.rejected().len(),
        "loaded unit catalog"
    );
    Ok(catalog)
}

fn find_unit<'a>(catalog: &'a UnitCatalog, unit: &str) -> Result<&'a UnitProperties, Report> {
    catalog
        .require_unit(unit)
        .map_err(|e| rootcause::report!("{e}"))
}

fn list(
    catalog: &UnitCatalog,
    filters: &[String],
    sort: &str,
    descending: bool,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<(), Report> {
    let filters = filters
        .iter()
        .map(|filter| filter.parse::<Filter>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| rootcause::report!("{e}"))?;
    let sort: Column = sort.parse().map_err(|e| rootcause::report!("{e}"))?;

    let buildable = catalog
        .buildable_units()
        .into_iter()
        .filter_map(|unit_ref| catalog.unit_by_ref(unit_ref.as_str()));
    let mut units = query::apply_filters(buildable, &filters);
    query::sort_units(&mut units, sort, descending);

    let mut rows = Rows::new(Column::ALL.iter().map(|column| column.title()));
    for unit in units {
        rows.push(Column::ALL.iter().map(|column| column.render(unit)).collect());
    }
    rows.write(format, out)
}

fn show(unit: &UnitProperties, format: OutputFormat, out: &mut impl Write) -> Result<(), Report> {
    let metrics = unit.combat_metrics();

    if format == OutputFormat::Json {
        serde_json::to_writer_pretty(&mut *out, &json!({ "unit": unit, "combat": metrics }))?;
        writeln!(out)?;
        return Ok(());
    }

    let mut rows = Rows::new(["Property", "Value"]);
    let mut add = |name: &str, value: String| rows.push(vec![name.to_string(), value]);
    add("Ref", unit.unit_ref().to_string());
    add("Faction", unit.faction_code().to_string());
    add("Tech level", format!("T{}", unit.tech_level()));
    add("Unit group", unit.custom_params().unit_group().to_string());
    add("Build time", format!("{}s", unit.build_duration().as_secs()));
    if let Some(options) = unit.build_options() {
        add("Build options", options.len().to_string());
    }
    for line in comparison::stat_lines(unit, &metrics, &BaseValues::default()) {
        add(line.stat.label(), format_stat(line.value));
    }
    if !metrics.weapon_summary.is_empty() {
        add("Weapons", metrics.weapon_summary.clone());
    }

    rows.write(format, out)
}

fn format_stat(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn compare(units: &[&UnitProperties], format: OutputFormat, out: &mut impl Write) -> Result<(), Report> {
    let base = BaseValues::from_units(units.iter().copied());
    let lines: Vec<_> = units
        .iter()
        .map(|unit| comparison::stat_lines(unit, &unit.combat_metrics(), &base))
        .collect();

    let mut rows = Rows::new(std::iter::once("Stat".to_string()).chain(units.iter().map(|u| u.unit_ref().to_string())));

    let mut stats = Vec::new();
    for line in lines.iter().flatten() {
        if !stats.contains(&line.stat) {
            stats.push(line.stat);
        }
    }
    for stat in stats {
        let mut row = vec![stat.label().to_string()];
        for unit_lines in &lines {
            let cell = unit_lines
                .iter()
                .find(|line| line.stat == stat)
                .map(|line| format!("{} ({:.0}%)", format_stat(line.value), line.fraction * 100.0))
                .unwrap_or_default();
            row.push(cell);
        }
        rows.push(row);
    }

    rows.write(format, out)
}

fn grid_rows(grid: &BuildGrid, rows: &mut Rows, label: &str) {
    for (index, cells) in grid.rows().iter().enumerate() {
        let mut row = vec![format!("{label} row {}", index + 1)];
        row.extend(cells.iter().map(|cell| cell.to_string()));
        rows.push(row);
    }
}

fn grid(catalog: &UnitCatalog, constructor: &str, format: OutputFormat, out: &mut impl Write) -> Result<(), Report> {
    let mut rows = Rows::new(["", "1", "2", "3", "4"]);

    if let Some(groups) = catalog.unit_grid().get(constructor) {
        if format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut *out, groups)?;
            writeln!(out)?;
            return Ok(());
        }
        for (index, group) in groups.iter().enumerate() {
            grid_rows(group, &mut rows, &format!("Group {}", index + 1));
        }
    } else if let Some(lab) = catalog.lab_grid().get(constructor) {
        if format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut *out, lab)?;
            writeln!(out)?;
            return Ok(());
        }
        grid_rows(lab, &mut rows, "Lab");
    } else {
        bail!("{constructor} has no build menu in the layout");
    }

    rows.write(format, out)
}

fn main() -> Result<(), Report> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let catalog = load_catalog(&args.game_dir)?;
    let mut out = std::io::stdout().lock();

    match &args.command {
        Command::List {
            filters,
            sort,
            descending,
        } => list(&catalog, filters, sort, *descending, args.format, &mut out)?,
        Command::Show { unit } => show(find_unit(&catalog, unit)?, args.format, &mut out)?,
        Command::Compare { units } => {
            let units = units
                .iter()
                .map(|unit| find_unit(&catalog, unit))
                .collect::<Result<Vec<_>, _>>()?;
            compare(&units, args.format, &mut out)?
        }
        Command::Grid { constructor } => grid(&catalog, constructor, args.format, &mut out)?,
        Command::Constructors => {
            let mut rows = Rows::new(["Ref", "Kind"]);
            for constructor in catalog.constructors() {
                rows.push(vec![constructor.unit_ref.to_string(), constructor.kind.to_string()]);
            }
            rows.write(args.format, &mut out)?
        }
        Command::Dump => {
            serde_json::to_writer_pretty(&mut out, &catalog)?;
            writeln!(out)?;
        }
    }

    Ok(())
}
