use std::collections::HashMap;

use serde::Serialize;

use super::schema::CartIngredient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Sums ingredient amounts across every recipe in a cart.
///
/// Rows are keyed by ingredient name alone: when the same name shows up with
/// two units, the first unit wins and the amounts are added regardless.
/// Output keeps first-seen order.
pub fn aggregate(entries: &[CartIngredient]) -> Vec<ShoppingListRow> {
    let mut rows: Vec<ShoppingListRow> = vec![];
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for entry in entries {
        match positions.get(entry.name.as_str()).copied() {
            Some(position) => rows[position].amount += i64::from(entry.amount),
            None => {
                positions.insert(entry.name.as_str(), rows.len());
                rows.push(ShoppingListRow {
                    name: entry.name.to_owned(),
                    measurement_unit: entry.measurement_unit.to_owned(),
                    amount: entry.amount.into(),
                });
            }
        }
    }

    rows
}

pub fn render(rows: &[ShoppingListRow]) -> String {
    rows.iter()
        .map(|row| format!("{} ({}) - {}\n", row.name, row.measurement_unit, row.amount))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(recipe_id: i32, name: &str, unit: &str, amount: i32) -> CartIngredient {
        CartIngredient {
            recipe_id,
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn same_ingredient_across_recipes_is_summed() {
        let cart = vec![line(1, "Salt", "g", 5), line(2, "Salt", "g", 10)];
        let rows = aggregate(&cart);

        assert_eq!(rows.len(), 1);
        assert_eq!(render(&rows), "Salt (g) - 15\n");
    }

    #[test]
    fn two_recipe_cart_keeps_first_seen_order() {
        let cart = vec![
            line(1, "Flour", "g", 200),
            line(1, "Sugar", "g", 50),
            line(2, "Flour", "g", 100),
            line(2, "Egg", "pcs", 2),
        ];
        let rows = aggregate(&cart);

        assert_eq!(
            rows,
            vec![
                ShoppingListRow {
                    name: "Flour".into(),
                    measurement_unit: "g".into(),
                    amount: 300
                },
                ShoppingListRow {
                    name: "Sugar".into(),
                    measurement_unit: "g".into(),
                    amount: 50
                },
                ShoppingListRow {
                    name: "Egg".into(),
                    measurement_unit: "pcs".into(),
                    amount: 2
                },
            ]
        );
        assert_eq!(
            render(&rows),
            "Flour (g) - 300\nSugar (g) - 50\nEgg (pcs) - 2\n"
        );
    }

    #[test]
    fn aggregation_does_not_alter_its_input() {
        let cart = vec![line(1, "Milk", "ml", 250), line(2, "Milk", "ml", 250)];
        let snapshot = cart.clone();

        let first = aggregate(&cart);
        let second = aggregate(&cart);

        assert_eq!(first, second);
        assert_eq!(cart, snapshot);
    }

    #[test]
    fn name_collision_keeps_first_unit() {
        let cart = vec![line(1, "Butter", "g", 100), line(2, "Butter", "tbsp", 2)];
        let rows = aggregate(&cart);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].measurement_unit, "g");
        assert_eq!(rows[0].amount, 102);
    }

    #[test]
    fn empty_input_renders_empty_report() {
        assert!(aggregate(&[]).is_empty());
        assert_eq!(render(&[]), "");
    }
}
