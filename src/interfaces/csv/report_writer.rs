use crate::domain::order::Order;
use crate::domain::product::Product;
use crate::error::Result;
use std::io::Write;

/// Writes the end-of-run orders and stock reports as CSV.
pub struct ReportWriter<W: Write> {
    writer: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_orders(&mut self, orders: &[Order]) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(&mut self.writer);
        csv_writer.write_record(["order_id", "user_id", "status", "total"])?;
        for order in orders {
            csv_writer.write_record([
                order.id.to_string(),
                order.user_id.to_string(),
                order.status.to_string(),
                order.total.to_string(),
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_stock(&mut self, products: &[Product]) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(&mut self.writer);
        csv_writer.write_record(["product_id", "name", "price", "quantity"])?;
        for product in products {
            csv_writer.write_record([
                product.id.to_string(),
                product.name.clone(),
                product.price.to_string(),
                product.quantity.to_string(),
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use crate::domain::order::OrderLineItem;
    use crate::domain::product::ProductId;
    use crate::domain::user::UserId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_orders_report_format() {
        let widget = Product::new(ProductId(101), "Widget", Money::new(dec!(10.00)), 5);
        let order = Order::new(UserId(1), vec![OrderLineItem::new(&widget, 2)]);

        let mut buffer = Vec::new();
        ReportWriter::new(&mut buffer).write_orders(&[order]).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with("order_id,user_id,status,total\n"));
        assert!(output.contains("0,1,pending,20.00"));
    }

    #[test]
    fn test_stock_report_format() {
        let widget = Product::new(ProductId(101), "Widget", Money::new(dec!(10.00)), 3);

        let mut buffer = Vec::new();
        ReportWriter::new(&mut buffer).write_stock(&[widget]).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with("product_id,name,price,quantity\n"));
        assert!(output.contains("101,Widget,10.00,3"));
    }
}
