use std::collections::HashMap;

pub(crate) const SERVICE_NAME: &str = "minder-sync";

/// Saved sign-in for one backend: who to sign in as, and with what.
#[derive(Debug, Clone)]
pub struct SavedLogin {
    pub email: String,
    pub password: String,
}

/// Store a backend login in the system keyring via Secret Service. The
/// email rides along as a lookup attribute; only the password is secret.
pub async fn store_login(server: &str, login: &SavedLogin) -> Result<(), String> {
    let keyring = oo7::Keyring::new()
        .await
        .map_err(|e| format!("Failed to connect to keyring: {}", e))?;

    let mut attrs = HashMap::new();
    attrs.insert("service", SERVICE_NAME);
    attrs.insert("server", server);
    attrs.insert("account", login.email.as_str());

    keyring
        .create_item(
            &format!("Minder backend ({})", server),
            &attrs,
            login.password.as_bytes(),
            true, // replace existing
        )
        .await
        .map_err(|e| format!("Failed to store login: {}", e))?;

    Ok(())
}

/// Load the saved login for a backend, if one exists.
pub async fn load_login(server: &str) -> Result<Option<SavedLogin>, String> {
    let keyring = oo7::Keyring::new()
        .await
        .map_err(|e| format!("Failed to connect to keyring: {}", e))?;

    let mut attrs = HashMap::new();
    attrs.insert("service", SERVICE_NAME);
    attrs.insert("server", server);

    let items = keyring
        .search_items(&attrs)
        .await
        .map_err(|e| format!("Failed to search keyring: {}", e))?;

    let Some(item) = items.first() else {
        return Ok(None);
    };

    let email = item
        .attributes()
        .await
        .map_err(|e| format!("Failed to read attributes: {}", e))?
        .get("account")
        .cloned()
        .unwrap_or_default();

    let secret_bytes = item
        .secret()
        .await
        .map_err(|e| format!("Failed to read secret: {}", e))?;
    let password = String::from_utf8(secret_bytes.to_vec())
        .map_err(|e| format!("Invalid UTF-8 in secret: {}", e))?;

    if email.is_empty() || password.is_empty() {
        return Ok(None);
    }
    Ok(Some(SavedLogin { email, password }))
}

/// Forget the saved login for a backend.
pub async fn delete_login(server: &str) -> Result<(), String> {
    let keyring = oo7::Keyring::new()
        .await
        .map_err(|e| format!("Failed to connect to keyring: {}", e))?;

    let mut attrs = HashMap::new();
    attrs.insert("service", SERVICE_NAME);
    attrs.insert("server", server);

    let items = keyring
        .search_items(&attrs)
        .await
        .map_err(|e| format!("Failed to search keyring: {}", e))?;

    for item in items {
        item.delete()
            .await
            .map_err(|e| format!("Failed to delete login: {}", e))?;
    }

    Ok(())
}
