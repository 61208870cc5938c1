//! Email templates for funding notifications

use uuid::Uuid;

/// Render the agreement email sent to each investor once a loan is fully
/// funded.
pub fn agreement_email(investor: &str, loan_id: Uuid, agreement_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Investment Agreement</title>
</head>
<body>
    <p>Dear {investor},</p>
    <p>Congratulations! The investment for Loan ID <strong>{loan_id}</strong> has been fully funded.</p>
    <p>You can review and download the investment agreement using the link below:</p>
    <p><a href="{agreement_url}" target="_blank">Download Agreement</a></p>
    <p>Thank you for your trust in our platform.</p>
    <br>
    <p>Best Regards,</p>
    <p><strong>Your Loan Platform Team</strong></p>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agreement_email_contains_link_and_loan() {
        let loan_id = Uuid::new_v4();
        let body = agreement_email("inv@x.io", loan_id, "http://localhost:8080/api/files/abc");

        assert!(body.contains("inv@x.io"));
        assert!(body.contains(&loan_id.to_string()));
        assert!(body.contains("http://localhost:8080/api/files/abc"));
    }
}
