//! Cadence sources with token placeholders.
//!
//! `TokenName`, `TOKEN_NAME` and `tokenName` stand for the contract name in
//! CamelCase, SCREAMING_SNAKE and lowerCamel. `TOKEN_NAME_ADDRESS` therefore
//! becomes e.g. `FLOW_TOKEN_ADDRESS` before addresses are filled in.

pub const GENERIC_FUNGIBLE_TRANSFER: &str = r#"import FungibleToken from FUNGIBLE_TOKEN_ADDRESS
import TokenName from TOKEN_NAME_ADDRESS

transaction(amount: UFix64, recipient: Address) {
    let sentVault: @FungibleToken.Vault

    prepare(signer: AuthAccount) {
        let vaultRef = signer.borrow<&TokenName.Vault>(from: /storage/tokenNameVault)
            ?? panic("Could not borrow reference to the owner's vault")

        self.sentVault <- vaultRef.withdraw(amount: amount)
    }

    execute {
        let receiverRef = getAccount(recipient)
            .getCapability(/public/tokenNameReceiver)
            .borrow<&{FungibleToken.Receiver}>()
            ?? panic("Could not borrow receiver reference to the recipient's vault")

        receiverRef.deposit(from: <-self.sentVault)
    }
}
"#;

pub const GENERIC_FUNGIBLE_SETUP: &str = r#"import FungibleToken from FUNGIBLE_TOKEN_ADDRESS
import TokenName from TOKEN_NAME_ADDRESS

transaction {
    prepare(signer: AuthAccount) {
        if signer.borrow<&TokenName.Vault>(from: /storage/tokenNameVault) == nil {
            signer.save(<-TokenName.createEmptyVault(), to: /storage/tokenNameVault)

            signer.link<&TokenName.Vault{FungibleToken.Receiver}>(
                /public/tokenNameReceiver,
                target: /storage/tokenNameVault
            )

            signer.link<&TokenName.Vault{FungibleToken.Balance}>(
                /public/tokenNameBalance,
                target: /storage/tokenNameVault
            )
        }
    }
}
"#;

pub const GENERIC_FUNGIBLE_BALANCE: &str = r#"import FungibleToken from FUNGIBLE_TOKEN_ADDRESS
import TokenName from TOKEN_NAME_ADDRESS

pub fun main(account: Address): UFix64 {
    let vaultRef = getAccount(account)
        .getCapability(/public/tokenNameBalance)
        .borrow<&TokenName.Vault{FungibleToken.Balance}>()
        ?? panic("Could not borrow Balance reference to the Vault")

    return vaultRef.balance
}
"#;
