use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::BudgetView;

const INSTRUCTIONS: &str = r#"You turn a spoken financial update into ledger transactions.

Reply with a single JSON object and nothing else:
{
  "status": "ok" | "needs_clarification" | "error" | "empty",
  "message": "short reason, only for error",
  "transactions": [
    {
      "type": "income" | "expense" | "transfer",
      "amount": 12.34,
      "date": "YYYY-MM-DD",
      "memo": "short note or null",
      "account": "account name or null",
      "to_account": "destination account name, transfers only",
      "category": "category name or null",
      "payee": "merchant or person, or null"
    }
  ]
}

Rules:
- One entry per transaction, in the order they were spoken.
- Use names from the lists below when one fits. Never invent ids.
- If the speaker didn't say which account or category, use null.
- Amounts are positive numbers; the type carries the direction.
- Omit the date unless the speaker gave one.
- Use "empty" when there is no money movement in the transcript.
- Use "error" when the transcript is about money but cannot be understood."#;

const CATEGORY_INSTRUCTIONS: &str = r#"You turn a spoken request into new budget categories.

Reply with a single JSON object and nothing else:
{
  "status": "ok" | "error" | "empty",
  "message": "short reason, only for error",
  "categories": [
    { "name": "category name", "group": "group name or null" }
  ]
}

Rules:
- One entry per category the speaker asked to create, in the order spoken.
- Use Title Case for names and keep them short.
- Put a category in one of the existing groups below when the speaker names one or one clearly fits; otherwise use the group the speaker said, or null.
- Do not repeat categories that already exist.
- Use "empty" when the speaker did not ask for any category.
- Use "error" when the request cannot be understood."#;

fn section(out: &mut String, title: &str, names: impl Iterator<Item = String>) {
    let _ = writeln!(out, "\n{title}:");
    let mut any = false;
    for name in names {
        let _ = writeln!(out, "- {name}");
        any = true;
    }
    if !any {
        let _ = writeln!(out, "(none)");
    }
}

pub fn system_prompt(view: &BudgetView, today: NaiveDate) -> String {
    let mut out = String::from(INSTRUCTIONS);
    let _ = writeln!(out, "\n\nToday is {}.", today.format("%Y-%m-%d"));
    section(&mut out, "Accounts", view.accounts.iter().map(|a| a.name.clone()));
    section(
        &mut out,
        "Categories",
        view.categories.iter().map(|c| match &c.group_name {
            Some(g) => format!("{} ({g})", c.name),
            None => c.name.clone(),
        }),
    );
    section(&mut out, "Payees", view.payees.iter().map(|p| p.name.clone()));
    out
}

pub fn category_prompt(view: &BudgetView) -> String {
    let mut out = String::from(CATEGORY_INSTRUCTIONS);
    out.push('\n');
    let mut groups: Vec<&str> = view.categories.iter().filter_map(|c| c.group_name.as_deref()).collect();
    groups.sort_unstable();
    groups.dedup();
    section(&mut out, "Existing groups", groups.into_iter().map(str::to_string));
    section(&mut out, "Existing categories", view.categories.iter().map(|c| c.name.clone()));
    out
}
