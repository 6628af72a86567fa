use crate::argparse::{CheckArgs, CompileArgs, OperatorsArgs, StateCommands};
use crate::utils::{print_json, read_json_arg};
use anyhow::{anyhow, Context, Result};
use console_dsl::state::{filter_param, from_query_param, share_url, to_query_param};
use console_dsl::{compile, operators_for, parse_query, DataType, FieldConfig, FilterCondition};
use tabular::{Row, Table};

pub fn handle_operators_command(args: OperatorsArgs) -> Result<()> {
    let data_type: DataType = args.data_type.parse().map_err(|e: String| anyhow!(e))?;
    print!("{}", operators_table(data_type));
    Ok(())
}

pub fn handle_compile_command(args: CompileArgs) -> Result<()> {
    let fields: Vec<FieldConfig> = read_json_arg(&args.fields).context("Invalid --fields")?;
    let conditions: Vec<FilterCondition> =
        read_json_arg(&args.conditions).context("Invalid --conditions")?;
    println!("{}", compile(&conditions, &fields));
    Ok(())
}

pub fn handle_check_command(args: CheckArgs) -> Result<()> {
    match parse_query(&args.query) {
        Ok(Some(expr)) => print_json(&expr),
        Ok(None) => {
            println!("null");
            Ok(())
        }
        Err(e) => Err(anyhow!("{}\n  {}\n  {}^", e, args.query, " ".repeat(e.position))),
    }
}

pub fn handle_state_command(command: StateCommands) -> Result<()> {
    match command {
        StateCommands::Encode { conditions, url } => {
            let conditions: Vec<FilterCondition> =
                read_json_arg(&conditions).context("Invalid --conditions")?;
            match url {
                Some(url) => println!("{}", share_url(&url, &conditions)),
                None => println!("{}", to_query_param(&conditions)),
            }
        }
        StateCommands::Decode { param } => {
            match filter_param(&param).and_then(from_query_param) {
                Some(conditions) => print_json(&conditions)?,
                None => println!("[]"),
            }
        }
    }
    Ok(())
}

fn operators_table(data_type: DataType) -> Table {
    #[allow(clippy::literal_string_with_formatting_args)]
    let mut table = Table::new("{:<}  {:<}  {:<}  {:<}")
        .with_row(Row::from_cells(["Operator", "Label", "Operands", "Input"].iter().cloned()));

    for config in operators_for(data_type) {
        let operands = match (config.requires_value, config.requires_second_value) {
            (false, _) => "0",
            (true, false) => "1",
            (true, true) => "2",
        };
        table.add_row(
            Row::new()
                .with_cell(config.operator)
                .with_cell(config.label)
                .with_cell(operands)
                .with_cell(format!("{:?}", config.value_kind).to_lowercase()),
        );
    }
    table
}
