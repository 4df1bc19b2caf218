//! Command line front end: compiles schema files into Cypher statements.
#![forbid(unsafe_code)]

mod ui;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sombra_pattern::{
    query::{taxonomy_count_query, Parameters},
    GraphSchema, NodeId, PatternConfig, ProviderRegistry, QuerySession, QueryStructure,
};
use tracing_subscriber::EnvFilter;

use ui::{Theme, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "sombra-pattern",
    version,
    about = "Compile visual graph patterns into Cypher statements",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "SOMBRA_PATTERN_CONFIG",
        help = "Configuration file (defaults to the user config directory)"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = Theme::Auto,
        help = "Color theme for text output"
    )]
    theme: Theme,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Build a graph from a schema file and print its statements")]
    Compile(CompileCmd),

    #[command(about = "Print the taxonomy count statement of every searchable label")]
    Taxonomy,

    #[command(about = "Print the resolved metadata of every configured label")]
    Labels,
}

#[derive(Args, Debug)]
struct CompileCmd {
    #[arg(value_name = "SCHEMA", help = "Schema file (.toml or .json)")]
    schema: PathBuf,

    #[arg(long, value_enum, default_value_t = QueryKind::Result)]
    kind: QueryKind,

    #[arg(
        long,
        value_name = "VAR",
        help = "Query variable of the target node (defaults to the root)"
    )]
    node: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
enum QueryKind {
    Result,
    Graph,
    Count,
    Values,
    Relations,
}

impl QueryKind {
    fn as_str(self) -> &'static str {
        match self {
            QueryKind::Result => "result",
            QueryKind::Graph => "graph",
            QueryKind::Count => "count",
            QueryKind::Values => "values",
            QueryKind::Relations => "relations",
        }
    }

    fn targets_node(self) -> bool {
        matches!(
            self,
            QueryKind::Count | QueryKind::Values | QueryKind::Relations
        )
    }
}

#[derive(Debug, Serialize)]
struct CompiledQuery {
    node: String,
    label: String,
    statement: String,
    parameters: Parameters,
}

#[derive(Debug, Serialize)]
struct CompileReport {
    kind: QueryKind,
    queries: Vec<CompiledQuery>,
}

#[derive(Debug, Serialize)]
struct LabelReport {
    label: String,
    parent: Option<String>,
    constraint_attribute: String,
    return_attributes: Vec<String>,
    predefined_constraints: Vec<String>,
    value_order_by: Option<String>,
    value_order_ascending: bool,
    result_order_by: Option<String>,
    result_order_ascending: bool,
    searchable: bool,
    group: bool,
    auto_expand_relations: bool,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sombra_pattern=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let ui = Ui::new(cli.theme);
    let config = PatternConfig::load(cli.config)?;
    let registry = config.registry();

    match cli.command {
        Command::Compile(cmd) => {
            let schema = read_schema(&cmd.schema)?;
            if cmd.node.is_some() && !cmd.kind.targets_node() {
                ui.warn(&format!(
                    "--node is ignored for {} queries",
                    cmd.kind.as_str()
                ));
            }
            let mut session = QuerySession::new(registry, config.query.clone());
            session.load_schema(&schema)?;
            let report = compile(&session, &cmd)?;
            emit(&cli.format, &report, |_| print_compile_text(&ui, &report))?;
        }
        Command::Taxonomy => {
            let queries: Vec<CompiledQuery> = registry
                .labels()
                .into_iter()
                .filter(|label| registry.resolve(label).searchable)
                .map(|label| {
                    compiled(
                        String::new(),
                        label.to_owned(),
                        taxonomy_count_query(&registry, label),
                    )
                })
                .collect();
            emit(&cli.format, &queries, |_| print_taxonomy_text(&ui, &queries))?;
        }
        Command::Labels => {
            let labels = label_reports(&registry);
            emit(&cli.format, &labels, |_| print_labels_text(&ui, &labels))?;
        }
    }

    Ok(())
}

fn read_schema(path: &Path) -> Result<GraphSchema, Box<dyn Error>> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read schema {}: {err}", path.display()))?;
    let schema = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&contents)?,
        _ => toml::from_str(&contents)?,
    };
    Ok(schema)
}

fn compile(
    session: &QuerySession<ProviderRegistry>,
    cmd: &CompileCmd,
) -> Result<CompileReport, Box<dyn Error>> {
    let graph = session.graph();
    let builder = session.builder();
    let target = match (&cmd.node, cmd.kind.targets_node()) {
        (Some(var), true) => Some(
            graph
                .find_by_internal_label(var)
                .map(|node| node.id)
                .ok_or_else(|| format!("no node uses the variable '{var}'"))?,
        ),
        _ => None,
    };

    let describe = |id: NodeId, structure: QueryStructure| -> Result<CompiledQuery, Box<dyn Error>> {
        let node = graph.node(id)?;
        Ok(compiled(
            node.internal_label.clone(),
            node.label.clone(),
            structure,
        ))
    };

    let root = graph.root_id()?;
    let queries = match cmd.kind {
        QueryKind::Result => vec![describe(root, builder.result_query()?)?],
        QueryKind::Graph => vec![describe(root, builder.graph_result_query()?)?],
        QueryKind::Count => match target {
            Some(id) => vec![describe(id, builder.node_count_query(id)?)?],
            None => builder
                .count_queries()?
                .into_iter()
                .map(|(id, structure)| describe(id, structure))
                .collect::<Result<_, _>>()?,
        },
        QueryKind::Values => {
            let id = target.unwrap_or(root);
            vec![describe(id, builder.node_value_query(id)?)?]
        }
        QueryKind::Relations => {
            let id = target.unwrap_or(root);
            vec![describe(id, builder.node_relation_query(id)?)?]
        }
    };

    Ok(CompileReport {
        kind: cmd.kind,
        queries,
    })
}

fn compiled(node: String, label: String, structure: QueryStructure) -> CompiledQuery {
    let statement = structure.into_statement();
    CompiledQuery {
        node,
        label,
        statement: statement.statement,
        parameters: statement.parameters,
    }
}

fn label_reports(registry: &ProviderRegistry) -> Vec<LabelReport> {
    registry
        .labels()
        .into_iter()
        .map(|label| {
            let resolved = registry.resolve(label);
            LabelReport {
                label: resolved.label.clone(),
                parent: resolved.parent.clone(),
                constraint_attribute: resolved.constraint_attribute.to_string(),
                return_attributes: resolved
                    .return_attributes
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                predefined_constraints: resolved.predefined_constraints.clone(),
                value_order_by: resolved.value_order_by.clone(),
                value_order_ascending: resolved.value_order_ascending,
                result_order_by: resolved.result_order_by.clone(),
                result_order_ascending: resolved.result_order_ascending,
                searchable: resolved.searchable,
                group: resolved.group,
                auto_expand_relations: resolved.auto_expand_relations,
            }
        })
        .collect()
}

fn emit<T, F>(format: &OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: serde::Serialize,
    F: Fn(OutputFormat),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(OutputFormat::Text),
    }
    Ok(())
}

fn print_compile_text(ui: &Ui, report: &CompileReport) {
    for (idx, query) in report.queries.iter().enumerate() {
        if idx > 0 {
            ui.spacer();
        }
        ui.heading(&format!(
            "{} query for {} ({})",
            report.kind.as_str(),
            query.node,
            query.label
        ));
        ui.statement(&query.statement);
        ui.parameters(&query.parameters);
    }
}

fn print_taxonomy_text(ui: &Ui, queries: &[CompiledQuery]) {
    if queries.is_empty() {
        ui.info("no searchable labels configured");
        return;
    }
    for (idx, query) in queries.iter().enumerate() {
        if idx > 0 {
            ui.spacer();
        }
        ui.heading(&query.label);
        ui.statement(&query.statement);
    }
}

fn print_labels_text(ui: &Ui, labels: &[LabelReport]) {
    if labels.is_empty() {
        ui.info("no labels configured");
        return;
    }
    for (idx, report) in labels.iter().enumerate() {
        if idx > 0 {
            ui.spacer();
        }
        let order = |key: &Option<String>, ascending: bool| match key {
            Some(key) if ascending => format!("{key} ASC"),
            Some(key) => format!("{key} DESC"),
            None => "-".to_owned(),
        };
        let rows = vec![
            ("parent", report.parent.clone().unwrap_or_else(|| "-".into())),
            ("constraint", report.constraint_attribute.clone()),
            ("returns", report.return_attributes.join(", ")),
            (
                "value order",
                order(&report.value_order_by, report.value_order_ascending),
            ),
            (
                "result order",
                order(&report.result_order_by, report.result_order_ascending),
            ),
            ("searchable", report.searchable.to_string()),
            ("group", report.group.to_string()),
            ("auto expand", report.auto_expand_relations.to_string()),
        ];
        ui.section(&report.label, rows);
        ui.list(
            "predefined constraints",
            report.predefined_constraints.iter().cloned(),
        );
    }
}
