use std::io::{BufRead, Write};

use alloy::primitives::{
    utils::{parse_units, ParseUnits},
    U256,
};
use eyre::OptionExt;

use crate::{
    chain::{Config, RouteProfile},
    error::AmountError,
};

/// Per-transaction amount as typed and in base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    pub display: String,
    pub raw: U256,
}

pub fn parse_amount(input: &str, decimals: u8) -> Result<Amount, AmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AmountError::Empty);
    }
    if input.starts_with('-') {
        return Err(AmountError::Negative);
    }
    if let Some((_, fraction)) = input.split_once('.') {
        if fraction.len() > decimals as usize {
            return Err(AmountError::Invalid(format!(
                "at most {decimals} decimal places allowed"
            )));
        }
    }
    let raw = match parse_units(input, decimals) {
        Ok(ParseUnits::U256(raw)) => raw,
        Ok(ParseUnits::I256(_)) => return Err(AmountError::Negative),
        Err(e) => return Err(AmountError::Invalid(e.to_string())),
    };
    if raw.is_zero() {
        return Err(AmountError::Zero);
    }
    Ok(Amount {
        display: input.to_string(),
        raw,
    })
}

fn ask<R, W>(input: &mut R, output: &mut W, question: &str) -> eyre::Result<String>
where
    R: BufRead,
    W: Write,
{
    write!(output, "{question}")?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        eyre::bail!("input closed while waiting for an answer");
    }
    Ok(line.trim().to_string())
}

/// Shows the route menu until a listed option is picked.
pub fn select_route<'a, R, W>(
    input: &mut R,
    output: &mut W,
    routes: &'a [RouteProfile],
) -> eyre::Result<&'a RouteProfile>
where
    R: BufRead,
    W: Write,
{
    writeln!(output, "Available routes:")?;
    for (i, route) in routes.iter().enumerate() {
        writeln!(output, "  {}. {}", i + 1, route.label)?;
    }
    loop {
        let answer = ask(input, output, &format!("Select a route [1-{}]: ", routes.len()))?;
        let picked = answer
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| routes.get(i));
        match picked {
            Some(route) => return Ok(route),
            None => writeln!(
                output,
                "Invalid option {answer:?}, pick a number between 1 and {}",
                routes.len()
            )?,
        }
    }
}

pub fn read_count<R, W>(input: &mut R, output: &mut W) -> eyre::Result<u32>
where
    R: BufRead,
    W: Write,
{
    loop {
        let answer = ask(input, output, "Transactions per wallet: ")?;
        match answer.parse::<u32>() {
            Ok(n) if n > 0 => return Ok(n),
            _ => writeln!(output, "Enter a whole number greater than zero")?,
        }
    }
}

pub fn read_amount<R, W>(
    input: &mut R,
    output: &mut W,
    route: &RouteProfile,
) -> eyre::Result<Amount>
where
    R: BufRead,
    W: Write,
{
    loop {
        let answer = ask(
            input,
            output,
            &format!("Amount of {} per transaction: ", route.asset.symbol),
        )?;
        match parse_amount(&answer, route.asset.decimals) {
            Ok(amount) => return Ok(amount),
            Err(e) => writeln!(output, "{e}")?,
        }
    }
}

/// Resolves a route key given on the command line.
pub fn route_by_key<'a>(config: &'a Config, key: &str) -> eyre::Result<&'a RouteProfile> {
    config.route(key).ok_or_eyre(format!(
        "unknown route {key}, expected one of: {}",
        config
            .routes
            .iter()
            .map(|r| r.key.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ))
}
