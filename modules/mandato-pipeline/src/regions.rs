//! State capitals for the capital-substitution rule: when a politician has
//! no explicit city, regional collection uses their state's capital.

pub fn state_capital(uf: &str) -> Option<&'static str> {
    let capital = match uf.to_uppercase().as_str() {
        "AC" => "Rio Branco",
        "AL" => "Maceió",
        "AP" => "Macapá",
        "AM" => "Manaus",
        "BA" => "Salvador",
        "CE" => "Fortaleza",
        "DF" => "Brasília",
        "ES" => "Vitória",
        "GO" => "Goiânia",
        "MA" => "São Luís",
        "MT" => "Cuiabá",
        "MS" => "Campo Grande",
        "MG" => "Belo Horizonte",
        "PA" => "Belém",
        "PB" => "João Pessoa",
        "PR" => "Curitiba",
        "PE" => "Recife",
        "PI" => "Teresina",
        "RJ" => "Rio de Janeiro",
        "RN" => "Natal",
        "RS" => "Porto Alegre",
        "RO" => "Porto Velho",
        "RR" => "Boa Vista",
        "SC" => "Florianópolis",
        "SP" => "São Paulo",
        "SE" => "Aracaju",
        "TO" => "Palmas",
        _ => return None,
    };
    Some(capital)
}
