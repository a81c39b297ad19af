//! Common regex patterns for invoice field detection.
//!
//! Patterns run against single normalized lines. The capture group named
//! `value` holds the field value.

use lazy_static::lazy_static;
use regex::Regex;

/// Monetary value: optional sign, currency symbol or code, grouped digits.
const MONEY: &str = r"(?P<value>-?\(?(?:[$€£]\s?|(?:USD|EUR|GBP|CAD|AUD)\s?)?-?(?:\d{1,3}(?:[,.' ]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d{1,2})?)\)?)";

/// A monetary label value must close the line, optionally with a currency code.
const MONEY_END: &str = r"(?:\s*(?:USD|EUR|GBP|CAD|AUD|[$€£]))?\s*$";

/// Between label and value: a rate like `(8%)`, a parenthetical, a colon.
const SEP: &str = r"\s*(?:\(?\s*\d{1,2}(?:\.\d+)?\s*%\s*\)?|\([^)]{0,20}\))?\s*[:#=]?\s*";

/// Identifier such as an invoice or PO number.
const ID: &str = r"(?P<value>[A-Z0-9](?:[A-Z0-9\-/_.]*[A-Z0-9])?)";

const MONTHS: &str = r"(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?";

fn money_label(label: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b(?:{label})\b{SEP}{MONEY}{MONEY_END}")).unwrap()
}

fn id_label(label: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b(?:{label})\s*[:#.]?\s*{ID}")).unwrap()
}

fn date_label(label: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b(?:{label})\b\s*[:.]?\s*{}", DATE_VALUE.as_str())).unwrap()
}

/// A block header: the label alone on its line, or followed by a colon.
fn section_header(label: &str) -> Regex {
    Regex::new(&format!(r"(?i)^(?:{label})\s*(?::\s*(?P<rest>.*)|$)")).unwrap()
}

fn text_label(label: &str) -> Regex {
    Regex::new(&format!(r"(?i)^(?:{label})\s*:\s*(?P<value>\S.*)$")).unwrap()
}

lazy_static! {
    // Dates
    pub static ref DATE_VALUE: Regex = Regex::new(&format!(
        r"(?i)(?P<value>\b\d{{4}}-\d{{1,2}}-\d{{1,2}}\b|\b\d{{1,2}}[/.\-]\d{{1,2}}[/.\-]\d{{2,4}}\b|\b{MONTHS}\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}\b|\b\d{{1,2}}(?:st|nd|rd|th)?\s+{MONTHS},?\s+\d{{4}}\b)"
    )).unwrap();

    pub static ref DATE_NUMERIC: Regex = Regex::new(
        r"^(\d{1,4})[/.\-](\d{1,2})[/.\-](\d{1,4})$"
    ).unwrap();

    pub static ref DATE_MONTH_NAME: Regex = Regex::new(
        r"(?i)^([a-z]+)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})$"
    ).unwrap();

    pub static ref DATE_DAY_MONTH_NAME: Regex = Regex::new(
        r"(?i)^(\d{1,2})(?:st|nd|rd|th)?\s+([a-z]+)\.?,?\s+(\d{4})$"
    ).unwrap();

    pub static ref INVOICE_DATE: Regex = date_label(
        r"invoice\s+date|date\s+of\s+(?:issue|invoice)|issue\s+date|date\s+issued|issued(?:\s+on)?|billing\s+date|bill\s+date"
    );

    pub static ref DATE_GENERIC: Regex = date_label(r"date|dated");

    pub static ref DUE_DATE: Regex = date_label(
        r"due\s+date|payment\s+due(?:\s+date)?|due\s+by|due\s+on|pay\s+by"
    );

    pub static ref SHIP_DATE: Regex = date_label(
        r"ship(?:ping|ped)?\s+date|date\s+shipped|delivery\s+date|shipped\s+on"
    );

    /// Text right before a generic `Date:` label that means it is another date.
    pub static ref NON_INVOICE_DATE_PREFIX: Regex = Regex::new(
        r"(?i)\b(?:due|ship(?:ping|ped)?|delivery|order|service|payment|expiry|expiration|print(?:ed)?)\s*$"
    ).unwrap();

    // Invoice identifiers
    pub static ref INVOICE_NUMBER: Regex = id_label(
        r"invoice\s*(?:number|no\.?|num\.?|nbr|#|id)|invoice\s+#"
    );

    pub static ref INVOICE_NUMBER_SHORT: Regex = id_label(r"\binv(?:oice)?\b\.?");

    pub static ref HASH_NUMBER: Regex = Regex::new(&format!(r"#\s*[:.]?\s*{ID}")).unwrap();

    /// Text before a bare `#` that ties the number to something else.
    pub static ref NON_INVOICE_HASH_PREFIX: Regex = Regex::new(
        r"(?i)\b(?:p\.?\s?o\.?|purchase\s+order|order|account|acct|customer|cust|client|ref(?:erence)?|routing|tax\s*id|vat|phone|tel|suite|ste|apt|unit|check|cheque)\.?\s*(?:no\.?|number)?\s*$"
    ).unwrap();

    pub static ref PO_NUMBER: Regex = id_label(
        r"p\.\s?o\.?(?:\s*(?:number|no\.?|#))?|\bpo\b(?:\s*(?:number|no\.?|#))?|purchase\s+order(?:\s*(?:number|no\.?|#))?"
    );

    pub static ref CUSTOMER_ID: Regex = id_label(
        r"\b(?:customer|cust\.?|client|account|acct\.?)\s*(?:id|no\.?|number|#)"
    );

    // Totals
    pub static ref SUBTOTAL: Regex = money_label(r"sub[\s-]*total");

    pub static ref NET_AMOUNT: Regex = money_label(
        r"net\s+(?:amount|total)|total\s+before\s+tax|amount\s+before\s+tax"
    );

    pub static ref TAX_AMOUNT: Regex = money_label(
        r"(?:sales\s+)?tax(?:\s+amount)?|vat(?:\s+amount)?|gst|hst"
    );

    pub static ref TAX_RATE: Regex = Regex::new(
        r"(?i)\b(?:sales\s+)?(?:tax|vat|gst|hst)\s*(?:rate)?\s*[:(@]?\s*(?P<value>\d{1,2}(?:\.\d{1,3})?)\s*%"
    ).unwrap();

    pub static ref DISCOUNT: Regex = money_label(r"discount|rebate|promo(?:tion)?");

    pub static ref LESS: Regex = money_label(r"less");

    pub static ref SHIPPING: Regex = money_label(
        r"shipping(?:\s*(?:&|and)\s*handling)?|freight|delivery(?:\s+charges?)?|postage"
    );

    pub static ref HANDLING: Regex = money_label(r"handling|s\s*&\s*h|ship");

    pub static ref GRAND_TOTAL: Regex = money_label(
        r"grand\s+total|total\s+(?:amount\s+)?due|invoice\s+total|total\s+payable|total\s+(?:amount\s+)?\(?(?:USD|EUR|GBP|CAD|AUD)\)?"
    );

    pub static ref TOTAL: Regex = money_label(r"total(?:\s+amount)?");

    /// Text right before a `Total` label that makes it another total.
    pub static ref NON_GRAND_TOTAL_PREFIX: Regex = Regex::new(
        r"(?i)\b(?:sub[\s-]*|tax\s+|vat\s+|line\s+|page\s+|net\s+)$"
    ).unwrap();

    pub static ref AMOUNT_DUE: Regex = money_label(r"amount\s+due|amount\s+payable|please\s+pay");

    pub static ref BALANCE_DUE: Regex = money_label(
        r"balance(?:\s+due)?|amount\s+due|remaining\s+balance"
    );

    pub static ref AMOUNT_PAID: Regex = money_label(
        r"amount\s+paid|paid\s+to\s+date|total\s+paid|payments?\s+received|less\s+payments?"
    );

    /// Any currency-marked amount in running text.
    pub static ref CURRENCY_AMOUNT: Regex = Regex::new(
        r"(?i)(?P<value>(?:[$€£]\s?|\b(?:USD|EUR|GBP|CAD|AUD)\s?)(?:\d{1,3}(?:[,.' ]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d{1,2})?))"
    ).unwrap();

    // Currency
    pub static ref CURRENCY_LABEL: Regex = Regex::new(
        r"(?i)\bcurrency\s*[:.]?\s*(?P<value>[A-Z]{3}|[$€£])"
    ).unwrap();

    pub static ref CURRENCY_MARK: Regex = Regex::new(
        r"(?P<value>[$€£]|\b(?:USD|EUR|GBP|CAD|AUD|CHF|JPY|NZD)\b)"
    ).unwrap();

    // Terms and payment
    pub static ref PAYMENT_TERMS: Regex = Regex::new(
        r"(?i)\bpayment\s+terms?\b\s*[:.]?\s*(?P<value>\S.*)$"
    ).unwrap();

    pub static ref TERMS_LABEL: Regex = text_label(r"terms");

    pub static ref TERMS_PHRASE: Regex = Regex::new(
        r"(?i)(?P<value>\b(?:\d{1,2}\s*/\s*\d{1,2}\s+)?net\s*\d{1,3}\b|\bdue\s+(?:on|upon)\s+receipt\b|\bcash\s+on\s+delivery\b|\bc\.?o\.?d\.?\b)"
    ).unwrap();

    pub static ref PAYMENT_METHOD: Regex = Regex::new(
        r"(?i)\b(?:payment\s+method|method\s+of\s+payment|pay(?:ment)?\s+(?:via|by|with)|paid\s+(?:via|by|with))\b\s*[:.]?\s*(?P<value>[A-Za-z][A-Za-z /&-]{1,40})"
    ).unwrap();

    pub static ref ACCEPTED_PAYMENT: Regex = Regex::new(
        r"(?i)\b(?:we\s+accept|accepted\s+payments?|payable\s+(?:by|via))\b\s*[:.]?\s*(?P<value>[A-Za-z][A-Za-z /&-]{1,40})"
    ).unwrap();

    // Bank details
    pub static ref BANK_NAME: Regex = Regex::new(
        r"(?i)^(?:bank(?:\s+name)?|beneficiary\s+bank|name\s+of\s+bank)\s*:\s*(?P<value>[A-Za-z][A-Za-z0-9&.,' -]+)$"
    ).unwrap();

    pub static ref ACCOUNT_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:(?:bank\s+)?account|acct\.?|a/c)\s*(?:number|no\.?|#)\s*[:.]?\s*(?P<value>\d[\d -]{3,}\d)\b"
    ).unwrap();

    pub static ref ROUTING_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:routing|aba|sort\s+code|bsb|transit)\s*(?:number|no\.?|#|code)?\s*[:.]?\s*(?P<value>\d[\d -]{4,}\d)\b"
    ).unwrap();

    pub static ref IBAN_LABEL: Regex = Regex::new(
        r"(?i)\biban\b\s*(?:number|no\.?)?\s*[:.]?\s*(?P<value>[A-Z]{2}\d{2}(?: ?[A-Z0-9]{1,4}){3,8})"
    ).unwrap();

    pub static ref IBAN_BARE: Regex = Regex::new(
        r"\b(?P<value>[A-Z]{2}\d{2}(?: ?[A-Z0-9]{4}){3,7}(?: ?[A-Z0-9]{1,3})?)\b"
    ).unwrap();

    pub static ref SWIFT_CODE: Regex = Regex::new(
        r"(?i)\b(?:swift(?:\s*/\s*bic)?|bic(?:\s*/\s*swift)?)(?:\s+code)?\s*[:.]?\s*(?P<value>[A-Z]{6}[A-Z0-9]{2}(?:[A-Z0-9]{3})?)\b"
    ).unwrap();

    // Vendor / contact
    pub static ref COMPANY_SUFFIX: Regex = Regex::new(
        r"(?P<value>\b[A-Z][A-Za-z0-9&.,' -]*?\s(?i:inc|llc|l\.l\.c|ltd|limited|corp|corporation|co|company|gmbh|plc|llp|pty|s\.a|b\.v)\b\.?)"
    ).unwrap();

    pub static ref ADDRESS_LABEL: Regex = text_label(r"address|addr\.?|vendor\s+address");

    pub static ref STREET_ZIP: Regex = Regex::new(
        r"(?P<value>\b\d{1,6}\s+[A-Za-z0-9 .,'#-]+?,?\s+[A-Z]{2}\s+\d{5}(?:-\d{4})?\b)"
    ).unwrap();

    pub static ref TAX_ID: Regex = Regex::new(
        r"(?i)\b(?:tax\s*id(?:\s*(?:no\.?|number))?|tin|ein|fein|vat\s*(?:reg(?:istration)?\s*)?(?:no\.?|number|id)|gst\s*(?:no\.?|number|id)|abn|federal\s+(?:tax\s+)?id|employer\s+id)\b\s*[:#.]?\s*(?P<value>[A-Z]{0,3}[ -]?\d[\d -]{4,}\d[A-Z0-9]{0,3})"
    ).unwrap();

    pub static ref PHONE_LABEL: Regex = Regex::new(
        r"(?i)\b(?:phone|tel(?:ephone)?|ph|mobile|cell|call)\b\.?\s*[:#.]?\s*(?P<value>\+?[\d(][\d ().-]{6,}\d)"
    ).unwrap();

    pub static ref PHONE_BARE: Regex = Regex::new(
        r"(?P<value>(?:\+\d{1,3}[ .-]?)?\(?\b\d{3}\)?[ .-]\d{3}[ .-]\d{4}\b)"
    ).unwrap();

    pub static ref EMAIL_LABEL: Regex = Regex::new(
        r"(?i)\be-?mail\b\s*[:.]?\s*(?P<value>[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,})"
    ).unwrap();

    pub static ref EMAIL: Regex = Regex::new(
        r"(?i)(?P<value>\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b)"
    ).unwrap();

    pub static ref WEBSITE_LABEL: Regex = Regex::new(
        r"(?i)\b(?:web(?:site)?|url|homepage)\b\s*[:.]?\s*(?P<value>(?:https?://)?[A-Z0-9-]+(?:\.[A-Z0-9-]+)+(?:/\S*)?)"
    ).unwrap();

    pub static ref WEBSITE: Regex = Regex::new(
        r"(?i)(?P<value>\b(?:https?://|www\.)[A-Z0-9-]+(?:\.[A-Z0-9-]+)+(?:/\S*)?)"
    ).unwrap();

    // Parties
    pub static ref VENDOR_SECTION: Regex = section_header(
        r"from|vendor|seller|supplier|sold\s+by|bill\s+from|billed\s+by|remit\s+to|company|issued\s+by|pay\s+to"
    );

    pub static ref CUSTOMER_SECTION: Regex = section_header(
        r"bill(?:ed)?\s+to|sold\s+to|invoice\s+to|customer|client|buyer"
    );

    pub static ref SHIP_TO_SECTION: Regex = section_header(
        r"ship(?:ped)?\s+to|deliver(?:ed)?\s+to|delivery\s+address"
    );

    /// A line that opens another labelled block or field.
    pub static ref LABEL_LINE: Regex = Regex::new(
        r"(?i)^[A-Za-z][A-Za-z .#/&-]{0,30}:|^(?:invoice|bill(?:ed)?\s+to|ship(?:ped)?\s+to|sold\s+to|from|description|qty|quantity|item)\b"
    ).unwrap();

    /// Words that disqualify a line from being a vendor name heading.
    pub static ref NOT_A_NAME: Regex = Regex::new(
        r"(?i)\b(?:invoice|receipt|statement|bill|date|page|total|due|tax|quote|estimate|purchase\s+order|original|copy)\b"
    ).unwrap();

    // Notes
    pub static ref NOTES: Regex = text_label(r"notes?|comments?|memo|remarks?|message");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
        re.captures(text).and_then(|c| c.name("value")).map(|m| m.as_str())
    }

    #[test]
    fn test_money_labels_close_the_line() {
        assert_eq!(value(&TOTAL, "Total: $1,242.50"), Some("$1,242.50"));
        assert_eq!(value(&TOTAL, "TOTAL 99.00 USD"), Some("99.00"));
        assert_eq!(value(&SHIPPING, "Shipping 1 10.00 10.00"), None);
        assert_eq!(value(&TAX_AMOUNT, "Tax (8%): $8.00"), Some("$8.00"));
        assert_eq!(value(&TAX_AMOUNT, "Tax: 8%"), None);
        assert_eq!(value(&SUBTOTAL, "Sub-Total: 1.234,56"), Some("1.234,56"));
    }

    #[test]
    fn test_grand_total_variants() {
        assert_eq!(value(&GRAND_TOTAL, "Total Due: $1,242.50"), Some("$1,242.50"));
        assert_eq!(value(&GRAND_TOTAL, "Grand Total 500.00"), Some("500.00"));
        assert_eq!(value(&TOTAL, "Total Due: $1,242.50"), None);
    }

    #[test]
    fn test_invoice_number_patterns() {
        assert_eq!(value(&INVOICE_NUMBER, "Invoice #: INV-2024-001"), Some("INV-2024-001"));
        assert_eq!(value(&INVOICE_NUMBER, "Invoice Number: 12345"), Some("12345"));
        assert_eq!(value(&INVOICE_NUMBER, "INVOICE NO. A/2024/17"), Some("A/2024/17"));
        assert_eq!(value(&PO_NUMBER, "PO #: PO-2024-456"), Some("PO-2024-456"));
        assert_eq!(value(&PO_NUMBER, "Position 5"), None);
    }

    #[test]
    fn test_date_patterns() {
        assert_eq!(value(&INVOICE_DATE, "Invoice Date: 12/15/2024"), Some("12/15/2024"));
        assert_eq!(value(&DUE_DATE, "Due Date: January 14, 2025"), Some("January 14, 2025"));
        assert_eq!(value(&DATE_GENERIC, "Date: 2024-12-15"), Some("2024-12-15"));
        assert_eq!(value(&DATE_VALUE, "Issued 3rd March 2024 by"), Some("3rd March 2024"));
    }

    #[test]
    fn test_contact_patterns() {
        assert_eq!(value(&EMAIL, "billing@acme.com"), Some("billing@acme.com"));
        assert_eq!(value(&PHONE_LABEL, "Phone: (555) 123-4567"), Some("(555) 123-4567"));
        assert_eq!(value(&TAX_ID, "Tax ID: 12-3456789"), Some("12-3456789"));
        assert_eq!(value(&WEBSITE, "Visit www.acme.com today"), Some("www.acme.com"));
    }
}
