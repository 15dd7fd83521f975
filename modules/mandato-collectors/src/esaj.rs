//! TJSP e-SAJ case-search adapter.
//!
//! The search form sits behind a CAPTCHA, so this adapter never fetches
//! results itself. It degrades to URL generation: it builds the exact query
//! URL plus instructions for the human step, and exposes a pure parser for
//! the result HTML fetched manually.

use chrono::{DateTime, NaiveDate, Utc};
use scraper::{ElementRef, Html, Selector};

use mandato_common::{ConsultationStub, CourtCase};

const FIRST_DEGREE_URL: &str = "https://esaj.tjsp.jus.br/cpopg";
const SECOND_DEGREE_URL: &str = "https://esaj.tjsp.jus.br/cposg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourtDegree {
    First,
    Second,
}

impl CourtDegree {
    fn base_url(&self) -> &'static str {
        match self {
            CourtDegree::First => FIRST_DEGREE_URL,
            CourtDegree::Second => SECOND_DEGREE_URL,
        }
    }
}

pub struct EsajClient;

impl EsajClient {
    /// Build the manual consultation URL. CPF takes precedence over name.
    pub fn consultation_url(cpf: Option<&str>, name: Option<&str>, degree: CourtDegree) -> String {
        let (search_kind, value) = match cpf {
            Some(cpf) => ("DOCPARTE", digits_only(cpf)),
            None => ("NMPARTE", name.unwrap_or_default().to_string()),
        };

        format!(
            "{}/search.do?conversationId=&cbPesquisa={}&dadosConsulta.tipoNuProcesso=UNIFICADO&dadosConsulta.valorConsulta={}",
            degree.base_url(),
            search_kind,
            urlencoding::encode(&value)
        )
    }

    /// The record handed back instead of structured results: the query URL
    /// plus instructions for the human-in-the-loop step.
    pub fn consultation_stub(
        politician_id: i64,
        name: &str,
        cpf: Option<&str>,
        degree: CourtDegree,
    ) -> ConsultationStub {
        let url = Self::consultation_url(cpf, Some(name), degree);
        let instructions = format!(
            "Abra a URL no navegador, resolva o CAPTCHA e salve o HTML da página \
             de resultados. Envie o HTML para ingestão via parse_result_html. \
             Consulta por {} no TJSP ({}º grau).",
            if cpf.is_some() { "CPF" } else { "nome" },
            match degree {
                CourtDegree::First => 1,
                CourtDegree::Second => 2,
            },
        );

        ConsultationStub {
            politician_id,
            court: "TJSP".to_string(),
            url,
            instructions,
            created_at: Utc::now(),
        }
    }

    /// Parse a human-fetched e-SAJ result page into court cases. Pure; any
    /// unrecognized markup simply yields fewer rows.
    pub fn parse_result_html(html: &str, politician_id: Option<i64>) -> Vec<CourtCase> {
        let document = Html::parse_document(html);

        let row_selector =
            Selector::parse("tr.fundocinza1, tr.fundocinza2, tr.containerInterno").unwrap();
        let mut cases: Vec<CourtCase> = document
            .select(&row_selector)
            .filter_map(|row| extract_case_from_row(row, politician_id))
            .collect();

        if cases.is_empty() {
            // Newer result pages render cases as divs instead of table rows.
            let div_selector = Selector::parse("div#listaDeProcessos div.processo").unwrap();
            cases = document
                .select(&div_selector)
                .filter_map(|div| extract_case_from_div(div, politician_id))
                .collect();
        }

        cases
    }
}

fn extract_case_from_row(row: ElementRef, politician_id: Option<i64>) -> Option<CourtCase> {
    let link_selector = Selector::parse("a.linkProcesso").unwrap();
    let number_el = row.select(&link_selector).next()?;
    let number = number_el.text().collect::<String>().trim().to_string();
    if number.is_empty() {
        return None;
    }

    let case_class = cell_text(row, "td:nth-child(2), span.classeProcesso");
    let subject = cell_text(row, "td:nth-child(3), span.assuntoProcesso");
    let filed_at = cell_text(row, "td:nth-child(5), span.dataProcesso")
        .as_deref()
        .and_then(parse_br_date);

    Some(CourtCase {
        politician_id,
        court: "TJSP".to_string(),
        case_number: normalize_case_number(&number),
        case_class,
        subject,
        filed_at,
    })
}

fn extract_case_from_div(div: ElementRef, politician_id: Option<i64>) -> Option<CourtCase> {
    let link_selector = Selector::parse("a.linkProcesso").unwrap();
    let number_el = div.select(&link_selector).next()?;
    let number = number_el.text().collect::<String>().trim().to_string();
    if number.is_empty() {
        return None;
    }

    Some(CourtCase {
        politician_id,
        court: "TJSP".to_string(),
        case_number: normalize_case_number(&number),
        case_class: None,
        subject: None,
        filed_at: None,
    })
}

fn cell_text(el: ElementRef, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    el.select(&selector)
        .next()
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Normalize a CNJ case number: 20 digits formatted as
/// NNNNNNN-DD.AAAA.J.TR.OOOO; anything else passes through trimmed.
pub fn normalize_case_number(number: &str) -> String {
    let digits = digits_only(number);
    if digits.len() == 20 {
        format!(
            "{}-{}.{}.{}.{}.{}",
            &digits[..7],
            &digits[7..9],
            &digits[9..13],
            &digits[13..14],
            &digits[14..16],
            &digits[16..]
        )
    } else {
        number.trim().to_string()
    }
}

fn parse_br_date(raw: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y").ok()?;
    Some(DateTime::from_naive_utc_and_offset(
        date.and_hms_opt(0, 0, 0)?,
        Utc,
    ))
}
