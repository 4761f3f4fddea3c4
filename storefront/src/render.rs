//! HTML rendering of the page view model.
//!
//! Rendering is a pure function of its inputs. Every interpolated value goes
//! through [`Escaped`].

use crate::loader::PageViewModel;
use crate::params::{ACCOUNT_PARAM, FLAG_VALUE_PARAM};
use flag_client::Account;
use recommender::{Price, Product};
use std::fmt::{self, Display, Write};

/// Static inputs of the override form.
#[derive(Clone, Debug)]
pub struct FormOptions {
    pub title: String,
    pub strategies: Vec<String>,
    pub accounts: Vec<Account>,
}

struct Escaped<'a>(&'a str);

impl Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&#39;")?,
                c => f.write_char(c)?,
            }
        }
        Ok(())
    }
}

// The API sometimes returns UTF-8 euro signs decoded as Latin-1.
fn clean_price(price: &Price) -> String {
    price.to_string().replace("â‚¬", "€")
}

pub fn render_page(view: &PageViewModel, form: &FormOptions) -> String {
    let mut html = String::with_capacity(4096);
    write_page(&mut html, view, form).expect("writing into a String cannot fail");
    html
}

fn write_page(out: &mut String, view: &PageViewModel, form: &FormOptions) -> fmt::Result {
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"utf-8\">")?;
    writeln!(out, "<title>{}</title>", Escaped(&form.title))?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;
    writeln!(out, "<main>")?;
    writeln!(out, "<h1>{}</h1>", Escaped(&view.block_name))?;
    write_products(out, &view.products)?;
    write_form(out, view, form)?;
    write_debug_panel(out, view)?;
    writeln!(out, "</main>")?;
    writeln!(out, "</body>")?;
    writeln!(out, "</html>")
}

fn write_products(out: &mut String, products: &[Product]) -> fmt::Result {
    if products.is_empty() {
        return writeln!(
            out,
            "<p class=\"empty\">No recommendations available at the moment.</p>"
        );
    }

    writeln!(out, "<section class=\"carousel\">")?;
    for product in products {
        writeln!(
            out,
            "<article class=\"product\" data-product-id=\"{}\">",
            Escaped(&product.id)
        )?;
        writeln!(
            out,
            "<img src=\"{}\" alt=\"{}\" loading=\"lazy\">",
            Escaped(&product.image_url),
            Escaped(&product.name)
        )?;
        writeln!(out, "<h2>{}</h2>", Escaped(&product.name))?;
        if let Some(price) = &product.price {
            writeln!(out, "<p class=\"price\">{}</p>", Escaped(&clean_price(price)))?;
        }
        writeln!(out, "</article>")?;
    }
    writeln!(out, "</section>")
}

fn write_form(out: &mut String, view: &PageViewModel, form: &FormOptions) -> fmt::Result {
    let current_value = view.flag_value.as_deref();

    writeln!(out, "<form method=\"get\" action=\"/\">")?;
    writeln!(out, "<label for=\"{FLAG_VALUE_PARAM}\">Strategy</label>")?;
    writeln!(
        out,
        "<select id=\"{FLAG_VALUE_PARAM}\" name=\"{FLAG_VALUE_PARAM}\">"
    )?;
    let mut strategies: Vec<&str> = form.strategies.iter().map(String::as_str).collect();
    if let Some(value) = current_value
        && !strategies.contains(&value)
    {
        strategies.push(value);
    }
    for strategy in strategies {
        write_option(out, strategy, current_value == Some(strategy))?;
    }
    writeln!(out, "</select>")?;

    let current_account = view
        .account
        .map(|account| account.as_str())
        .or(view.overrides.account.as_deref());
    writeln!(out, "<label for=\"{ACCOUNT_PARAM}\">Account</label>")?;
    writeln!(out, "<select id=\"{ACCOUNT_PARAM}\" name=\"{ACCOUNT_PARAM}\">")?;
    for account in &form.accounts {
        write_option(
            out,
            account.as_str(),
            current_account == Some(account.as_str()),
        )?;
    }
    writeln!(out, "</select>")?;
    write_hidden_context(out, view)?;
    writeln!(out, "<button type=\"submit\">Apply</button>")?;
    writeln!(out, "</form>")?;

    writeln!(out, "<details>")?;
    writeln!(out, "<summary>Change manually</summary>")?;
    writeln!(out, "<form method=\"get\" action=\"/\">")?;
    writeln!(
        out,
        "<input type=\"text\" name=\"{FLAG_VALUE_PARAM}\" value=\"{}\" placeholder=\"Strategy id\">",
        Escaped(current_value.unwrap_or_default())
    )?;
    if let Some(account) = current_account {
        writeln!(
            out,
            "<input type=\"hidden\" name=\"{ACCOUNT_PARAM}\" value=\"{}\">",
            Escaped(account)
        )?;
    }
    write_hidden_context(out, view)?;
    writeln!(out, "<button type=\"submit\">Apply</button>")?;
    writeln!(out, "</form>")?;
    writeln!(out, "</details>")
}

fn write_option(out: &mut String, value: &str, selected: bool) -> fmt::Result {
    writeln!(
        out,
        "<option value=\"{0}\"{1}>{0}</option>",
        Escaped(value),
        if selected { " selected" } else { "" }
    )
}

// Extra query parameters survive a form submission.
fn write_hidden_context(out: &mut String, view: &PageViewModel) -> fmt::Result {
    for (key, value) in &view.overrides.extra_context {
        writeln!(
            out,
            "<input type=\"hidden\" name=\"{}\" value=\"{}\">",
            Escaped(key),
            Escaped(&value.to_string())
        )?;
    }
    Ok(())
}

fn write_debug_panel(out: &mut String, view: &PageViewModel) -> fmt::Result {
    writeln!(out, "<section class=\"debug\">")?;
    writeln!(out, "<h2>SERVER DEBUG INFO</h2>")?;
    writeln!(out, "<p>Visitor: {}</p>", Escaped(&view.visitor_id))?;
    if let Some(flag) = &view.flag {
        writeln!(
            out,
            "<p>Flag: {} = {}</p>",
            Escaped(&flag.key),
            Escaped(flag.value.as_deref().unwrap_or("none"))
        )?;
    }
    writeln!(out, "<pre>")?;
    for line in &view.logs {
        writeln!(out, "{}", Escaped(&line.to_string()))?;
    }
    writeln!(out, "</pre>")?;
    writeln!(out, "</section>")
}
